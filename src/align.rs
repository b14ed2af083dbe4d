//! Exact-timestamp alignment of long-format triples into wide rows
//!
//! Triples are grouped by their integer timestamp with no tolerance window.
//! Groups come out in ascending timestamp order; inside a group the last write
//! to a field wins.

use crate::schema::SchemaAccumulator;
use crate::types::{FieldMap, FlatRecord};
use std::collections::BTreeMap;

/// One output row: every value set at a single exact timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedRow {
    pub timestamp_ns: u64,
    /// Channels that contributed to this row, first-seen order
    pub channels: Vec<String>,
    pub cells: FieldMap,
}

impl AlignedRow {
    /// Value of a field at this timestamp, blank when absent
    pub fn value(&self, field: &str) -> &str {
        self.cells.get(field).map(String::as_str).unwrap_or("")
    }

    /// Cells in column order, blanks for absent fields
    pub fn values_for<'a>(&'a self, columns: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        columns.iter().map(move |column| self.value(column))
    }
}

/// Accumulates triples and emits aligned rows
#[derive(Debug, Default)]
pub struct TimeAligner {
    groups: BTreeMap<u64, AlignedRow>,
    schema: SchemaAccumulator,
}

impl TimeAligner {
    pub fn new() -> Self {
        Self::default()
    }

    fn group(&mut self, timestamp_ns: u64) -> &mut AlignedRow {
        self.groups.entry(timestamp_ns).or_insert_with(|| AlignedRow {
            timestamp_ns,
            ..AlignedRow::default()
        })
    }

    /// Add one (timestamp, field, value) triple
    pub fn push(&mut self, timestamp_ns: u64, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        self.schema.observe_path(&field);
        self.group(timestamp_ns).cells.insert(field, value.into());
    }

    /// Add every field of a flattened message
    pub fn push_record(&mut self, record: &FlatRecord) {
        self.schema.observe(&record.fields);
        let row = self.group(record.timestamp_ns);
        if !row.channels.iter().any(|c| c == &record.channel) {
            row.channels.push(record.channel.clone());
        }
        for (field, value) in &record.fields {
            row.cells.insert(field.clone(), value.clone());
        }
    }

    /// Schema seen so far
    pub fn schema(&self) -> &SchemaAccumulator {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.groups.len()
    }

    /// Rows sorted ascending by timestamp
    pub fn finish(self) -> (SchemaAccumulator, Vec<AlignedRow>) {
        (self.schema, self.groups.into_values().collect())
    }
}

/// Align a slice of triples in one call
pub fn align<'a, I>(triples: I) -> Vec<AlignedRow>
where
    I: IntoIterator<Item = (u64, &'a str, &'a str)>,
{
    let mut aligner = TimeAligner::new();
    for (timestamp_ns, field, value) in triples {
        aligner.push(timestamp_ns, field, value);
    }
    aligner.finish().1
}
