use crate::error::{ExportError, Result};
use crate::parser::decoder::PayloadDecoder;
use crate::types::{ChannelInfo, LogSummary, Message};
use mcap::{MessageStream, Summary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Leading magic of every MCAP container
pub const MCAP_MAGIC: &[u8] = b"\x89MCAP0\r\n";

/// An opened MCAP container
///
/// The container is read into memory once; [`LogReader::summary`] only looks
/// at the summary section, and [`LogReader::messages`] decodes lazily.
pub struct LogReader {
    path: PathBuf,
    data: Vec<u8>,
}

impl LogReader {
    /// Open a container from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "Cannot read container");
            ExportError::NotFound(path.to_path_buf())
        })?;
        debug!(
            path = %path.display(),
            size = data.len(),
            "Read container ({:.2} MB)",
            data.len() as f64 / 1024.0 / 1024.0
        );
        Self::from_bytes(path, data)
    }

    /// Wrap bytes already in memory; `path` is used for error messages
    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Result<Self> {
        let path = path.into();
        if !data.starts_with(MCAP_MAGIC) {
            return Err(ExportError::Corrupt {
                path,
                reason: "missing MCAP magic".to_string(),
            });
        }
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container size in bytes
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Channel catalog and time bounds from the summary section only
    pub fn summary(&self) -> Result<LogSummary> {
        let summary = match Summary::read(&self.data) {
            Ok(Some(summary)) => summary,
            Ok(None) => return Err(ExportError::MissingSummary(self.path.clone())),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Summary section unreadable");
                return Err(ExportError::MissingSummary(self.path.clone()));
            }
        };

        let mut channels: Vec<ChannelInfo> = summary
            .channels
            .values()
            .map(|channel| ChannelInfo {
                id: channel.id,
                topic: channel.topic.clone(),
                message_encoding: channel.message_encoding.clone(),
                schema_name: channel.schema.as_ref().map(|s| s.name.clone()),
                message_count: summary
                    .stats
                    .as_ref()
                    .and_then(|stats| stats.channel_message_counts.get(&channel.id).copied()),
            })
            .collect();
        channels.sort_by_key(|c| c.id);

        let (message_count, start_time_ns, end_time_ns) = match &summary.stats {
            Some(stats) => (
                Some(stats.message_count),
                Some(stats.message_start_time),
                Some(stats.message_end_time),
            ),
            None => (None, None, None),
        };

        Ok(LogSummary {
            channels,
            message_count,
            start_time_ns,
            end_time_ns,
        })
    }

    /// Lazy, single-pass sequence of decoded messages in storage order
    pub fn messages(&self) -> Result<MessageIter<'_>> {
        self.iter(None)
    }

    /// Like [`LogReader::messages`], but only decodes one channel
    pub fn messages_on(&self, topic: &str) -> Result<MessageIter<'_>> {
        self.iter(Some(topic.to_string()))
    }

    fn iter(&self, topic: Option<String>) -> Result<MessageIter<'_>> {
        let stream = MessageStream::new(&self.data).map_err(|e| ExportError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(MessageIter {
            stream,
            path: &self.path,
            topic,
            decoders: HashMap::new(),
            skipped: 0,
            done: false,
        })
    }
}

/// Iterator over decoded messages
///
/// Messages that fail to decode are logged and skipped. A container-level
/// error (truncation, bad record) ends the iteration; what was read stands.
pub struct MessageIter<'a> {
    stream: MessageStream<'a>,
    path: &'a Path,
    topic: Option<String>,
    decoders: HashMap<u16, Option<PayloadDecoder>>,
    skipped: usize,
    done: bool,
}

impl MessageIter<'_> {
    /// Messages skipped so far because they could not be decoded
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for MessageIter<'_> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        while !self.done {
            let raw = match self.stream.next() {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Container read stopped early; keeping messages read so far"
                    );
                    self.done = true;
                    break;
                }
                None => {
                    self.done = true;
                    break;
                }
            };

            let channel = &raw.channel;
            if let Some(topic) = &self.topic {
                if &channel.topic != topic {
                    continue;
                }
            }

            let decoder = self.decoders.entry(channel.id).or_insert_with(|| {
                let schema = channel
                    .schema
                    .as_ref()
                    .map(|s| (s.name.as_str(), s.encoding.as_str(), s.data.as_ref()));
                match PayloadDecoder::for_channel(&channel.message_encoding, schema) {
                    Ok(decoder) => Some(decoder),
                    Err(e) => {
                        warn!(topic = %channel.topic, error = %e, "Skipping channel");
                        None
                    }
                }
            });
            let Some(decoder) = decoder else {
                self.skipped += 1;
                continue;
            };

            match decoder.decode(&raw.data) {
                Ok(payload) => {
                    return Some(Message {
                        timestamp_ns: raw.log_time,
                        channel: channel.topic.clone(),
                        payload,
                    })
                }
                Err(e) => {
                    warn!(
                        topic = %channel.topic,
                        log_time = raw.log_time,
                        error = %e,
                        "Skipping undecodable message"
                    );
                    self.skipped += 1;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let result = LogReader::open("/nonexistent/dir/log.mcap");
        assert!(matches!(result, Err(ExportError::NotFound(_))));
    }

    #[test]
    fn test_unreadable_source_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = LogReader::open(dir.path());
        assert!(matches!(result, Err(ExportError::NotFound(p)) if p == dir.path()));
    }

    #[test]
    fn test_bytes_without_magic_are_corrupt() {
        let result = LogReader::from_bytes("junk.mcap", b"not an mcap file".to_vec());
        assert!(matches!(result, Err(ExportError::Corrupt { .. })));
    }
}
