//! Export functionality for decoded logs
//!
//! Three writers share one input shape, a stream of [`FlatRecord`]s:
//! - [`WideWriter`] (omni): one row per exact timestamp, one column per path
//! - [`LongWriter`] (tvn): one `Time,Name,Value` row per field, streamed
//! - [`PlaceholderWriter`] (ld): a text summary, not a data table

pub mod long;
pub mod placeholder;
pub mod wide;

pub use long::LongWriter;
pub use placeholder::PlaceholderWriter;
pub use wide::WideWriter;

use crate::error::{ExportError, Result};
use crate::filters::FieldProfile;
use crate::flatten::{flatten, FlattenDepth};
use crate::parser::LogReader;
use crate::types::FlatRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Lead columns of the wide table
pub const WIDE_LEAD_COLUMNS: [&str; 2] = ["Time", "Topic"];
/// Columns of the long table
pub const LONG_COLUMNS: [&str; 3] = ["Time", "Name", "Value"];

/// Keywords used by the tvn profile when none are configured
pub fn default_keywords() -> Vec<String> {
    vec!["vectornav".to_string(), "tvn".to_string()]
}

/// Export format requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Wide, time-aligned table
    Omni,
    /// Long per-field table
    Tvn,
    /// Placeholder summary
    Ld,
}

impl ExportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Omni => "omni",
            ExportFormat::Tvn => "tvn",
            ExportFormat::Ld => "ld",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Omni | ExportFormat::Tvn => "csv",
            ExportFormat::Ld => "txt",
        }
    }

    /// False for the placeholder summary, which callers must not treat as a table
    pub fn is_data(&self) -> bool {
        !matches!(self, ExportFormat::Ld)
    }

    /// Profile used when the caller does not pick one
    pub fn default_profile(&self, keywords: &[String]) -> FieldProfile {
        match self {
            ExportFormat::Omni => FieldProfile::All,
            ExportFormat::Tvn => FieldProfile::keywords(keywords),
            ExportFormat::Ld => FieldProfile::None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "omni" | "wide" => Ok(ExportFormat::Omni),
            "tvn" | "long" => Ok(ExportFormat::Tvn),
            "ld" | "placeholder" => Ok(ExportFormat::Ld),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Export options for controlling conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub depth: FlattenDepth,
    /// Overrides the format's default profile
    pub profile: Option<FieldProfile>,
    /// Keywords for the tvn default profile
    pub keywords: Vec<String>,
    /// Directory for computed output paths (default: next to the input)
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            depth: FlattenDepth::Deep,
            profile: None,
            keywords: default_keywords(),
            output_dir: None,
        }
    }
}

impl ExportOptions {
    pub fn profile_for(&self, format: ExportFormat) -> FieldProfile {
        self.profile
            .clone()
            .unwrap_or_else(|| format.default_profile(&self.keywords))
    }
}

/// What an export produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub format: ExportFormat,
    pub output: PathBuf,
    /// Messages consumed
    pub messages: usize,
    /// Data rows written (zero for the placeholder)
    pub rows: usize,
    /// Distinct field paths exported
    pub columns: usize,
    /// False when the artifact is a summary rather than a table
    pub is_data: bool,
}

/// A sink for flattened records that produces one artifact
pub trait FormatWriter {
    fn write_record(&mut self, record: &FlatRecord) -> Result<()>;

    /// Complete the artifact and report what was written
    fn finish(self: Box<Self>) -> Result<ExportReport>;
}

/// Writer for a format
pub fn create_writer(
    format: ExportFormat,
    output: &Path,
    profile: FieldProfile,
) -> Result<Box<dyn FormatWriter>> {
    Ok(match format {
        ExportFormat::Omni => Box::new(WideWriter::create(output, profile)?),
        ExportFormat::Tvn => Box::new(LongWriter::create(output, profile)?),
        ExportFormat::Ld => Box::new(PlaceholderWriter::create(output)?),
    })
}

/// Create missing parent directories of an output path
pub fn ensure_parent_dir(output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Create an output file, parents included
pub fn create_output(output: &Path) -> Result<File> {
    ensure_parent_dir(output)?;
    File::create(output).map_err(|e| ExportError::io(output, e))
}

/// Output path for an input: `<dir>/<stem>.<format>.<ext>`
pub fn compute_export_path(input: &Path, format: ExportFormat, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("log");
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("{stem}.{}.{}", format.name(), format.extension()))
}

/// Convert a container to the requested format
///
/// The format name is checked before any filesystem access.
pub fn convert(source: &Path, output: &Path, format: &str, options: &ExportOptions) -> Result<ExportReport> {
    let format: ExportFormat = format.parse()?;
    let reader = LogReader::open(source)?;
    export_log(&reader, output, format, options)
}

/// Stream an opened container through flattening into a format writer
pub fn export_log(
    reader: &LogReader,
    output: &Path,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<ExportReport> {
    let mut writer = create_writer(format, output, options.profile_for(format))?;
    let mut messages = reader.messages()?;
    for message in &mut messages {
        let fields = flatten(&message.payload, "", options.depth);
        writer.write_record(&FlatRecord::new(message.timestamp_ns, message.channel, fields))?;
    }
    if messages.skipped() > 0 {
        warn!(
            path = %reader.path().display(),
            skipped = messages.skipped(),
            "Some messages could not be decoded and were left out"
        );
    }

    let report = writer.finish()?;
    info!(
        format = %report.format,
        output = %report.output.display(),
        messages = report.messages,
        rows = report.rows,
        columns = report.columns,
        "Export complete"
    );
    Ok(report)
}
