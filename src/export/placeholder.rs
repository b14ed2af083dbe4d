use super::{create_output, ExportFormat, ExportReport, FormatWriter};
use crate::error::{ExportError, Result};
use crate::schema::SchemaAccumulator;
use crate::types::FlatRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// First line of every placeholder artifact
pub const PLACEHOLDER_BANNER: &str = "# LD export placeholder: summary only, not a data table";

/// Placeholder (ld) summary: message count, distinct-field count, field list
///
/// The artifact is plain text and [`ExportReport::is_data`] is false for it.
pub struct PlaceholderWriter {
    output: PathBuf,
    file: File,
    schema: SchemaAccumulator,
}

impl PlaceholderWriter {
    pub fn create(output: &Path) -> Result<Self> {
        let file = create_output(output)?;
        Ok(Self {
            output: output.to_path_buf(),
            file,
            schema: SchemaAccumulator::new(),
        })
    }
}

impl FormatWriter for PlaceholderWriter {
    fn write_record(&mut self, record: &FlatRecord) -> Result<()> {
        self.schema.observe(&record.fields);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<ExportReport> {
        let PlaceholderWriter {
            output,
            file,
            schema,
        } = *self;

        let mut writer = BufWriter::new(file);
        let mut emit = || -> std::io::Result<()> {
            writeln!(writer, "{PLACEHOLDER_BANNER}")?;
            writeln!(writer, "messages: {}", schema.message_count())?;
            writeln!(writer, "distinct_fields: {}", schema.field_count())?;
            writeln!(writer, "fields:")?;
            for field in schema.columns() {
                writeln!(writer, "  {field}")?;
            }
            writer.flush()
        };
        emit().map_err(|e| ExportError::io(&output, e))?;

        Ok(ExportReport {
            format: ExportFormat::Ld,
            output,
            messages: schema.message_count(),
            rows: 0,
            columns: schema.field_count(),
            is_data: false,
        })
    }
}
