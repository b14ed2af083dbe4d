use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Channel metadata from the container summary section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: u16,
    pub topic: String,
    pub message_encoding: String,
    pub schema_name: Option<String>,
    pub message_count: Option<u64>,
}

/// Cheap container metadata, read from the index without decoding payloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub channels: Vec<ChannelInfo>,
    pub message_count: Option<u64>,
    pub start_time_ns: Option<u64>,
    pub end_time_ns: Option<u64>,
}

impl LogSummary {
    /// Channel topics in channel-id order
    pub fn topics(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.topic.clone()).collect()
    }

    pub fn has_channel(&self, topic: &str) -> bool {
        self.channels.iter().any(|c| c.topic == topic)
    }

    /// Duration of the log in nanoseconds, zero when bounds are unknown
    pub fn duration_ns(&self) -> u64 {
        match (self.start_time_ns, self.end_time_ns) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            _ => 0,
        }
    }
}

/// One coordinate on the role channel's track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub timestamp_ns: u64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Result record of the parse path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub source: PathBuf,
    pub file_size: u64,
    pub channels: Vec<String>,
    pub channel_count: usize,
    /// Seconds since the Unix epoch
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub duration_seconds: f64,
    /// Capture date, `%Y-%m-%d %H:%M:%S` in UTC
    pub formatted_date: Option<String>,
    /// First observed value of each mapped role
    pub roles: BTreeMap<String, String>,
    pub track: Vec<Coordinate>,
}
