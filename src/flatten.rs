//! Message flattening
//!
//! Turns a nested payload tree into a flat map of dotted field paths to
//! rendered strings. One function serves both the deep mode used by the
//! schema-unified exports and the shallow mode that only looks at top-level
//! fields.

use crate::conversion::scalar_to_string;
use crate::types::{FieldMap, PayloadStruct, PayloadValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How far flattening descends into nested structures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlattenDepth {
    /// Recurse into every nested structure
    #[default]
    Deep,
    /// Top-level fields only, each converted in one step
    Shallow,
}

/// Join a prefix and a field name with `.`, omitting the separator at the root
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Flatten a payload into path → value
pub fn flatten(payload: &PayloadStruct, prefix: &str, depth: FlattenDepth) -> FieldMap {
    let mut out = FieldMap::new();
    flatten_into(payload, prefix, depth, &mut out);
    out
}

/// Flatten into an existing map; later paths overwrite earlier ones
pub fn flatten_into(payload: &PayloadStruct, prefix: &str, depth: FlattenDepth, out: &mut FieldMap) {
    for (name, value) in &payload.fields {
        let path = join_path(prefix, name);
        match value {
            PayloadValue::Null => {}
            PayloadValue::Unreadable(reason) => {
                warn!(field = %path, %reason, "Could not process field, omitting");
            }
            PayloadValue::List(items) => flatten_list(&path, items, depth, out),
            PayloadValue::Struct(inner) => match depth {
                FlattenDepth::Deep => flatten_into(inner, &path, depth, out),
                FlattenDepth::Shallow => {
                    out.insert(path, scalar_to_string(value));
                }
            },
            scalar => {
                out.insert(path, scalar_to_string(scalar));
            }
        }
    }
}

fn flatten_list(path: &str, items: &[PayloadValue], depth: FlattenDepth, out: &mut FieldMap) {
    match items {
        [] => {
            out.insert(path.to_string(), String::new());
        }
        [PayloadValue::Struct(inner)] if depth == FlattenDepth::Deep => {
            flatten_into(inner, path, depth, out);
        }
        [PayloadValue::Unreadable(reason)] => {
            warn!(field = %path, %reason, "Could not process field, omitting");
        }
        [single] => {
            out.insert(path.to_string(), scalar_to_string(single));
        }
        many => {
            let joined: Vec<String> = many.iter().map(scalar_to_string).collect();
            out.insert(path.to_string(), joined.join(","));
        }
    }
}
