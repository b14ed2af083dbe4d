//! Scalar conversion rules for flattened output
//!
//! Every leaf of a payload tree ends up as a string cell. These functions are
//! the single place that decides how numbers, booleans, byte strings and
//! (when a structure must be shown as one cell) whole structs are rendered.

use crate::types::{PayloadStruct, PayloadValue};

/// Byte strings at or above this length are replaced by [`BINARY_MARKER`]
pub const BINARY_HEX_LIMIT: usize = 100;

/// Marker written instead of large byte strings
pub const BINARY_MARKER: &str = "[binary data]";

/// Render a float the way analysts expect to read it back
///
/// Shortest round-trip digits; integral values keep a trailing `.0` so the
/// column still reads as floating point.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let rendered = value.to_string();
    if rendered.contains('.') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

/// Hex-encode short byte strings, mark long ones
pub fn format_bytes(bytes: &[u8]) -> String {
    if bytes.len() < BINARY_HEX_LIMIT {
        hex::encode(bytes)
    } else {
        BINARY_MARKER.to_string()
    }
}

/// Convert one value to a single cell
///
/// Structs and lists are rendered inline; nothing here recurses into paths.
pub fn scalar_to_string(value: &PayloadValue) -> String {
    match value {
        PayloadValue::Null => String::new(),
        PayloadValue::Bool(b) => b.to_string(),
        PayloadValue::Int(i) => i.to_string(),
        PayloadValue::UInt(u) => u.to_string(),
        PayloadValue::Float(f) => format_float(*f),
        PayloadValue::Str(s) => s.clone(),
        PayloadValue::Bytes(bytes) => format_bytes(bytes),
        PayloadValue::Struct(inner) => struct_to_string(inner),
        PayloadValue::List(items) => {
            let rendered: Vec<String> = items.iter().map(scalar_to_string).collect();
            format!("[{}]", rendered.join(" "))
        }
        PayloadValue::Unreadable(reason) => format!("<unreadable: {reason}>"),
    }
}

/// Inline rendering of a struct: `{name: value name: value}`
///
/// Uses spaces rather than commas so a comma-joined list of structs still
/// splits into one token per item.
pub fn struct_to_string(value: &PayloadStruct) -> String {
    let parts: Vec<String> = value
        .fields
        .iter()
        .filter(|(_, v)| !matches!(v, PayloadValue::Null))
        .map(|(name, v)| format!("{name}: {}", scalar_to_string(v)))
        .collect();
    format!("{{{}}}", parts.join(" "))
}
