//! Per-channel payload decoders
//!
//! Each channel gets one decoder built from its schema record the first time
//! a message on it is seen. Decoders turn raw bytes into the encoding-neutral
//! [`PayloadStruct`] tree that the flattener understands.

use crate::error::{ExportError, Result};
use crate::types::{PayloadStruct, PayloadValue};
use prost_reflect::{
    DescriptorPool, DynamicMessage, Kind, MapKey, MessageDescriptor, ReflectMessage, Value,
};

/// Schema encoding used by protobuf channels
pub const ENCODING_PROTOBUF: &str = "protobuf";
/// Message encoding used by JSON channels
pub const ENCODING_JSON: &str = "json";

/// Decoder for one channel
#[derive(Debug, Clone)]
pub enum PayloadDecoder {
    Protobuf(MessageDescriptor),
    Json,
}

impl PayloadDecoder {
    /// Build a decoder from a channel's encodings and schema record
    ///
    /// `schema` is `(name, encoding, data)` when the channel has one.
    pub fn for_channel(message_encoding: &str, schema: Option<(&str, &str, &[u8])>) -> Result<Self> {
        match message_encoding {
            ENCODING_PROTOBUF => {
                let (name, encoding, data) = schema.ok_or_else(|| {
                    ExportError::Decode("protobuf channel has no schema".to_string())
                })?;
                if encoding != ENCODING_PROTOBUF {
                    return Err(ExportError::Decode(format!(
                        "protobuf channel carries a '{encoding}' schema"
                    )));
                }
                let pool = DescriptorPool::decode(data).map_err(|e| {
                    ExportError::Decode(format!("invalid descriptor set for {name}: {e}"))
                })?;
                let descriptor = pool.get_message_by_name(name).ok_or_else(|| {
                    ExportError::Decode(format!("message type {name} not in descriptor set"))
                })?;
                Ok(PayloadDecoder::Protobuf(descriptor))
            }
            ENCODING_JSON => Ok(PayloadDecoder::Json),
            other => Err(ExportError::Decode(format!(
                "unsupported message encoding '{other}'"
            ))),
        }
    }

    /// Decode one message body
    pub fn decode(&self, data: &[u8]) -> Result<PayloadStruct> {
        match self {
            PayloadDecoder::Protobuf(descriptor) => {
                let message = DynamicMessage::decode(descriptor.clone(), data)
                    .map_err(|e| ExportError::Decode(format!("{}: {e}", descriptor.full_name())))?;
                Ok(protobuf_struct(&message))
            }
            PayloadDecoder::Json => {
                let value: serde_json::Value = serde_json::from_slice(data)
                    .map_err(|e| ExportError::Decode(format!("invalid JSON payload: {e}")))?;
                match json_value(value) {
                    PayloadValue::Struct(inner) => Ok(inner),
                    other => Ok(PayloadStruct::new().with("value", other)),
                }
            }
        }
    }
}

/// Convert a dynamic protobuf message, visiting every declared field
pub fn protobuf_struct(message: &DynamicMessage) -> PayloadStruct {
    let mut out = PayloadStruct::new();
    for field in message.descriptor().fields() {
        let value = message.get_field(&field);
        out.push(field.name(), protobuf_value(&field.kind(), &value));
    }
    out
}

fn protobuf_value(kind: &Kind, value: &Value) -> PayloadValue {
    match value {
        Value::Bool(b) => PayloadValue::Bool(*b),
        Value::I32(i) => PayloadValue::Int(i64::from(*i)),
        Value::I64(i) => PayloadValue::Int(*i),
        Value::U32(u) => PayloadValue::UInt(u64::from(*u)),
        Value::U64(u) => PayloadValue::UInt(*u),
        Value::F32(f) => PayloadValue::Float(f64::from(*f)),
        Value::F64(f) => PayloadValue::Float(*f),
        Value::String(s) => PayloadValue::Str(s.clone()),
        Value::Bytes(b) => PayloadValue::Bytes(b.to_vec()),
        Value::EnumNumber(n) => match kind {
            Kind::Enum(descriptor) if descriptor.get_value(*n).is_none() => PayloadValue::Unreadable(
                format!("{} has no value {n}", descriptor.full_name()),
            ),
            _ => PayloadValue::Int(i64::from(*n)),
        },
        Value::Message(inner) => PayloadValue::Struct(protobuf_struct(inner)),
        Value::List(items) => PayloadValue::List(
            items.iter().map(|item| protobuf_value(kind, item)).collect(),
        ),
        Value::Map(entries) => {
            let value_kind = match kind {
                Kind::Message(entry) => entry.map_entry_value_field().kind(),
                other => other.clone(),
            };
            let mut sorted: Vec<(&MapKey, &Value)> = entries.iter().collect();
            sorted.sort_by(|a, b| compare_keys(a.0, b.0));
            PayloadValue::List(
                sorted
                    .into_iter()
                    .map(|(key, value)| {
                        PayloadValue::Struct(
                            PayloadStruct::new()
                                .with("key", map_key(key))
                                .with("value", protobuf_value(&value_kind, value)),
                        )
                    })
                    .collect(),
            )
        }
    }
}

fn map_key(key: &MapKey) -> PayloadValue {
    match key {
        MapKey::Bool(b) => PayloadValue::Bool(*b),
        MapKey::I32(i) => PayloadValue::Int(i64::from(*i)),
        MapKey::I64(i) => PayloadValue::Int(*i),
        MapKey::U32(u) => PayloadValue::UInt(u64::from(*u)),
        MapKey::U64(u) => PayloadValue::UInt(*u),
        MapKey::String(s) => PayloadValue::Str(s.clone()),
    }
}

fn compare_keys(a: &MapKey, b: &MapKey) -> std::cmp::Ordering {
    match (a, b) {
        (MapKey::Bool(x), MapKey::Bool(y)) => x.cmp(y),
        (MapKey::I32(x), MapKey::I32(y)) => x.cmp(y),
        (MapKey::I64(x), MapKey::I64(y)) => x.cmp(y),
        (MapKey::U32(x), MapKey::U32(y)) => x.cmp(y),
        (MapKey::U64(x), MapKey::U64(y)) => x.cmp(y),
        (MapKey::String(x), MapKey::String(y)) => x.cmp(y),
        // a map has a single key type
        _ => std::cmp::Ordering::Equal,
    }
}

/// Convert a JSON document into the payload tree; object keys come out sorted
pub fn json_value(value: serde_json::Value) -> PayloadValue {
    match value {
        serde_json::Value::Null => PayloadValue::Null,
        serde_json::Value::Bool(b) => PayloadValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                PayloadValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                PayloadValue::UInt(u)
            } else if let Some(f) = n.as_f64() {
                PayloadValue::Float(f)
            } else {
                PayloadValue::Unreadable(format!("number {n} out of range"))
            }
        }
        serde_json::Value::String(s) => PayloadValue::Str(s),
        serde_json::Value::Array(items) => {
            PayloadValue::List(items.into_iter().map(json_value).collect())
        }
        serde_json::Value::Object(map) => {
            let mut out = PayloadStruct::new();
            for (key, value) in map {
                out.push(key, json_value(value));
            }
            PayloadValue::Struct(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_decoder_builds_tree() {
        let decoder = PayloadDecoder::for_channel(ENCODING_JSON, None).unwrap();
        let payload = decoder
            .decode(br#"{"speed": 12.5, "gear": 3, "flags": [true, false], "pos": {"x": 1}, "note": null}"#)
            .unwrap();
        assert_eq!(payload.get("speed"), Some(&PayloadValue::Float(12.5)));
        assert_eq!(payload.get("gear"), Some(&PayloadValue::Int(3)));
        assert_eq!(payload.get("note"), Some(&PayloadValue::Null));
        assert!(matches!(payload.get("flags"), Some(PayloadValue::List(items)) if items.len() == 2));
        assert!(matches!(payload.get("pos"), Some(PayloadValue::Struct(_))));
    }

    #[test]
    fn test_json_scalar_document_is_wrapped() {
        let decoder = PayloadDecoder::Json;
        let payload = decoder.decode(b"42").unwrap();
        assert_eq!(payload.get("value"), Some(&PayloadValue::Int(42)));
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = PayloadDecoder::Json.decode(b"{not json").unwrap_err();
        assert!(matches!(err, ExportError::Decode(_)));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let err = PayloadDecoder::for_channel("cdr", None).unwrap_err();
        assert!(err.to_string().contains("cdr"));
    }

    #[test]
    fn test_protobuf_requires_schema() {
        assert!(PayloadDecoder::for_channel(ENCODING_PROTOBUF, None).is_err());
    }

    /// `enum Gear { PARK = 0; DRIVE = 1; }  message Car { Gear gear = 1; }`
    fn gear_schema() -> Vec<u8> {
        use prost::Message as _;
        use prost_types::field_descriptor_proto::{Label, Type};
        use prost_types::{
            DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
            FileDescriptorProto, FileDescriptorSet,
        };

        let value = |name: &str, number: i32| EnumValueDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            ..Default::default()
        };
        let file = FileDescriptorProto {
            name: Some("car.proto".to_string()),
            package: Some("telemetry".to_string()),
            syntax: Some("proto3".to_string()),
            enum_type: vec![EnumDescriptorProto {
                name: Some("Gear".to_string()),
                value: vec![value("PARK", 0), value("DRIVE", 1)],
                ..Default::default()
            }],
            message_type: vec![DescriptorProto {
                name: Some("Car".to_string()),
                field: vec![FieldDescriptorProto {
                    name: Some("gear".to_string()),
                    number: Some(1),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::Enum as i32),
                    type_name: Some(".telemetry.Gear".to_string()),
                    json_name: Some("gear".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        FileDescriptorSet { file: vec![file] }.encode_to_vec()
    }

    #[test]
    fn test_protobuf_enum_numbers() {
        let schema = gear_schema();
        let decoder = PayloadDecoder::for_channel(
            ENCODING_PROTOBUF,
            Some(("telemetry.Car", ENCODING_PROTOBUF, &schema)),
        )
        .unwrap();

        // field 1, varint 1
        let payload = decoder.decode(&[0x08, 0x01]).unwrap();
        assert_eq!(payload.get("gear"), Some(&PayloadValue::Int(1)));

        // 7 is not a declared Gear value
        let payload = decoder.decode(&[0x08, 0x07]).unwrap();
        assert!(matches!(
            payload.get("gear"),
            Some(PayloadValue::Unreadable(reason)) if reason == "telemetry.Gear has no value 7"
        ));
    }
}
