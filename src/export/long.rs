use super::{create_output, ExportFormat, ExportReport, FormatWriter, LONG_COLUMNS};
use crate::error::{ExportError, Result};
use crate::filters::FieldProfile;
use crate::schema::SchemaAccumulator;
use crate::types::{format_timestamp_ns, FlatRecord};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Long (tvn) table: one `Time,Name,Value` row per field of every message
///
/// Each row is flushed as soon as it is written, so a large conversion can be
/// inspected while it runs.
pub struct LongWriter {
    output: PathBuf,
    writer: csv::Writer<File>,
    profile: FieldProfile,
    names: SchemaAccumulator,
    messages: usize,
    rows: usize,
}

impl LongWriter {
    pub fn create(output: &Path, profile: FieldProfile) -> Result<Self> {
        let file = create_output(output)?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(LONG_COLUMNS)
            .map_err(|e| ExportError::csv(output, e))?;
        writer.flush().map_err(|e| ExportError::io(output, e))?;
        Ok(Self {
            output: output.to_path_buf(),
            writer,
            profile,
            names: SchemaAccumulator::new(),
            messages: 0,
            rows: 0,
        })
    }
}

impl FormatWriter for LongWriter {
    fn write_record(&mut self, record: &FlatRecord) -> Result<()> {
        self.messages += 1;
        let time = format_timestamp_ns(record.timestamp_ns);
        for (name, value) in &record.fields {
            if !self.profile.retains(name) {
                continue;
            }
            self.writer
                .write_record([time.as_str(), name.as_str(), value.as_str()])
                .map_err(|e| ExportError::csv(&self.output, e))?;
            self.writer
                .flush()
                .map_err(|e| ExportError::io(&self.output, e))?;
            self.names.observe_path(name);
            self.rows += 1;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<ExportReport> {
        self.writer
            .flush()
            .map_err(|e| ExportError::io(&self.output, e))?;
        Ok(ExportReport {
            format: ExportFormat::Tvn,
            output: self.output,
            messages: self.messages,
            rows: self.rows,
            columns: self.names.field_count(),
            is_data: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldMap;
    use tempfile::TempDir;

    fn record(ts: u64, pairs: &[(&str, &str)]) -> FlatRecord {
        let fields: FieldMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FlatRecord::new(ts, "imu", fields)
    }

    #[test]
    fn test_one_row_per_triple() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.tvn.csv");
        let mut writer = LongWriter::create(&output, FieldProfile::All).unwrap();
        writer
            .write_record(&record(1_500_000_000, &[("b", "2"), ("a", "1")]))
            .unwrap();

        // rows are on disk before finish
        let partial = std::fs::read_to_string(&output).unwrap();
        assert_eq!(partial.lines().count(), 3);

        writer.write_record(&record(1_500_000_000, &[("a", "9")])).unwrap();
        let report = Box::new(writer).finish().unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.columns, 2);

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Time,Name,Value",
                "1.500000000,a,1",
                "1.500000000,b,2",
                "1.500000000,a,9"
            ]
        );
    }

    #[test]
    fn test_keyword_profile_filters_names() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        let mut writer = LongWriter::create(&output, FieldProfile::keywords(["vectornav"])).unwrap();
        writer
            .write_record(&record(0, &[("VectorNav.yaw", "1.0"), ("battery", "12.0")]))
            .unwrap();
        let report = Box::new(writer).finish().unwrap();
        assert_eq!(report.rows, 1);

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("VectorNav.yaw"));
        assert!(!content.contains("battery"));
    }
}
