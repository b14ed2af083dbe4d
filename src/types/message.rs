use std::collections::BTreeMap;

/// Flattened field path → rendered value for one message
pub type FieldMap = BTreeMap<String, String>;

/// Decoded payload value tree, independent of the wire encoding
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// Explicit absence (JSON `null`); skipped when flattening
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Struct(PayloadStruct),
    List(Vec<PayloadValue>),
    /// A field that is present but could not be interpreted
    Unreadable(String),
}

/// Ordered named fields of a structured payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadStruct {
    pub fields: Vec<(String, PayloadValue)>,
}

impl PayloadStruct {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder-style field append, keeps declaration order
    pub fn with(mut self, name: impl Into<String>, value: PayloadValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: PayloadValue) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&PayloadValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One decoded message from a container pass
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Log time in nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
    pub channel: String,
    pub payload: PayloadStruct,
}

/// A message after flattening, the common input of every format writer
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub timestamp_ns: u64,
    pub channel: String,
    pub fields: FieldMap,
}

impl FlatRecord {
    pub fn new(timestamp_ns: u64, channel: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            timestamp_ns,
            channel: channel.into(),
            fields,
        }
    }
}

/// Render a nanosecond timestamp as decimal seconds with nine fractional digits
pub fn format_timestamp_ns(timestamp_ns: u64) -> String {
    format!(
        "{}.{:09}",
        timestamp_ns / 1_000_000_000,
        timestamp_ns % 1_000_000_000
    )
}

/// Convert a nanosecond timestamp to floating-point seconds
pub fn ns_to_seconds(timestamp_ns: u64) -> f64 {
    timestamp_ns as f64 / 1e9
}
