use crate::error::Result;
use crate::flatten::{flatten, FlattenDepth};
use crate::parser::reader::LogReader;
use crate::roles::FieldRoles;
use crate::schema::SchemaAccumulator;
use crate::types::{ns_to_seconds, LogSummary, ParseResult};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

/// Capture date of a log start time, UTC
pub fn format_capture_date(timestamp_ns: u64) -> Option<String> {
    let secs = i64::try_from(timestamp_ns / 1_000_000_000).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Parse path: summary metadata plus role-mapped field extraction
pub fn parse_log(path: &Path, roles: Option<&FieldRoles>) -> Result<ParseResult> {
    let reader = LogReader::open(path)?;
    let summary = reader.summary()?;

    let mut result = ParseResult {
        source: path.to_path_buf(),
        file_size: reader.len(),
        channels: summary.topics(),
        channel_count: summary.channels.len(),
        start_time: summary.start_time_ns.map(ns_to_seconds),
        end_time: summary.end_time_ns.map(ns_to_seconds),
        duration_seconds: ns_to_seconds(summary.duration_ns()),
        formatted_date: summary.start_time_ns.and_then(format_capture_date),
        ..ParseResult::default()
    };

    if let Some(roles) = roles {
        extract_roles(&reader, &summary, roles, &mut result)?;
    }

    info!(
        path = %path.display(),
        channels = result.channel_count,
        duration_s = result.duration_seconds,
        track_points = result.track.len(),
        "Parsed log"
    );
    Ok(result)
}

fn extract_roles(
    reader: &LogReader,
    summary: &LogSummary,
    roles: &FieldRoles,
    result: &mut ParseResult,
) -> Result<()> {
    if !summary.has_channel(&roles.channel) {
        warn!(channel = %roles.channel, "Role channel not present in log");
        return Ok(());
    }

    let track_wanted = roles.has_coordinates();
    let mut validated = false;
    for message in reader.messages_on(&roles.channel)? {
        let fields = flatten(&message.payload, "", FlattenDepth::Deep);
        if !validated {
            roles.validate(&SchemaAccumulator::accumulate([&fields]))?;
            result.roles = roles.extract(&fields);
            validated = true;
        }
        if !track_wanted {
            break;
        }
        match roles.coordinate(message.timestamp_ns, &fields) {
            Some(coordinate) => result.track.push(coordinate),
            None => debug!(log_time = message.timestamp_ns, "Skipping non-numeric coordinate"),
        }
    }
    if !validated {
        // nothing decodable on the channel, so no mapped path can match
        roles.validate(&SchemaAccumulator::new())?;
    }
    Ok(())
}
