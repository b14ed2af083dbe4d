//! Schema discovery across a pass
//!
//! The accumulator is an explicit value threaded through the export pipeline;
//! nothing here keeps global state between passes.

use crate::filters::{filter_paths, FieldProfile};
use crate::types::FieldMap;
use std::collections::BTreeSet;

/// Union of every field path seen in a pass, plus a message count
#[derive(Debug, Clone, Default)]
pub struct SchemaAccumulator {
    paths: BTreeSet<String>,
    messages: usize,
}

impl SchemaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate a whole sequence of field maps
    pub fn accumulate<'a, I>(field_maps: I) -> Self
    where
        I: IntoIterator<Item = &'a FieldMap>,
    {
        let mut acc = Self::new();
        for fields in field_maps {
            acc.observe(fields);
        }
        acc
    }

    /// Record the paths of one flattened message
    pub fn observe(&mut self, fields: &FieldMap) {
        self.messages += 1;
        for path in fields.keys() {
            self.observe_path(path);
        }
    }

    /// Record a single path without counting a message
    pub fn observe_path(&mut self, path: &str) {
        if !self.paths.contains(path) {
            self.paths.insert(path.to_string());
        }
    }

    /// Sorted, deduplicated column order
    pub fn columns(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }

    /// Columns retained by a profile, still sorted
    pub fn filtered(&self, profile: &FieldProfile) -> Vec<String> {
        filter_paths(&self.columns(), profile)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn field_count(&self) -> usize {
        self.paths.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages
    }
}
