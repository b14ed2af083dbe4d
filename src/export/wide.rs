use super::{create_output, ExportFormat, ExportReport, FormatWriter, WIDE_LEAD_COLUMNS};
use crate::align::TimeAligner;
use crate::error::{ExportError, Result};
use crate::filters::FieldProfile;
use crate::types::{format_timestamp_ns, FlatRecord};
use std::fs::File;
use std::io::BufWriter;
use std::iter::once;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Wide (omni) table: one row per exact timestamp, one column per field path
///
/// Records are buffered in a [`TimeAligner`] so the full column set is known
/// before the header is written.
pub struct WideWriter {
    output: PathBuf,
    file: File,
    profile: FieldProfile,
    aligner: TimeAligner,
    messages: usize,
}

impl WideWriter {
    pub fn create(output: &Path, profile: FieldProfile) -> Result<Self> {
        let file = create_output(output)?;
        Ok(Self {
            output: output.to_path_buf(),
            file,
            profile,
            aligner: TimeAligner::new(),
            messages: 0,
        })
    }
}

impl FormatWriter for WideWriter {
    fn write_record(&mut self, record: &FlatRecord) -> Result<()> {
        self.aligner.push_record(record);
        self.messages += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<ExportReport> {
        let WideWriter {
            output,
            file,
            profile,
            aligner,
            messages,
        } = *self;

        let (schema, rows) = aligner.finish();
        let columns = schema.filtered(&profile);
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));

        writer
            .write_record(WIDE_LEAD_COLUMNS.iter().copied().chain(columns.iter().map(String::as_str)))
            .map_err(|e| ExportError::csv(&output, e))?;

        for row in &rows {
            let time = format_timestamp_ns(row.timestamp_ns);
            let topic = row.channels.join("|");
            writer
                .write_record(
                    once(time.as_str())
                        .chain(once(topic.as_str()))
                        .chain(row.values_for(&columns)),
                )
                .map_err(|e| ExportError::csv(&output, e))?;
        }
        writer.flush().map_err(|e| ExportError::io(&output, e))?;

        debug!(
            rows = rows.len(),
            columns = columns.len(),
            discovered = schema.field_count(),
            "Wrote wide table"
        );

        Ok(ExportReport {
            format: ExportFormat::Omni,
            output,
            messages,
            rows: rows.len(),
            columns: columns.len(),
            is_data: true,
        })
    }
}
