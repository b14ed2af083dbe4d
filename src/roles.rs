//! Field-name → role mapping
//!
//! Callers say which flattened path on which channel plays a role (for
//! example `latitude`). The mapping is checked once against the paths the
//! channel actually carries; a path that is not there is an error, never a
//! cue to guess another spelling.

use crate::error::{ExportError, Result};
use crate::schema::SchemaAccumulator;
use crate::types::{Coordinate, FieldMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ROLE_LATITUDE: &str = "latitude";
pub const ROLE_LONGITUDE: &str = "longitude";

/// Role mapping for one channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRoles {
    pub channel: String,
    /// role → flattened field path
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl FieldRoles {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>, path: impl Into<String>) -> Self {
        self.fields.insert(role.into(), path.into());
        self
    }

    /// Every mapped path must exist in the discovered schema
    pub fn validate(&self, schema: &SchemaAccumulator) -> Result<()> {
        for (role, path) in &self.fields {
            if !schema.contains(path) {
                return Err(ExportError::RoleNotFound {
                    role: role.clone(),
                    path: path.clone(),
                    channel: self.channel.clone(),
                });
            }
        }
        Ok(())
    }

    /// Role values present in one flattened message
    pub fn extract(&self, fields: &FieldMap) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter_map(|(role, path)| fields.get(path).map(|value| (role.clone(), value.clone())))
            .collect()
    }

    /// Whether both coordinate roles are mapped
    pub fn has_coordinates(&self) -> bool {
        self.fields.contains_key(ROLE_LATITUDE) && self.fields.contains_key(ROLE_LONGITUDE)
    }

    /// Coordinate from one flattened message, when both values parse
    pub fn coordinate(&self, timestamp_ns: u64, fields: &FieldMap) -> Option<Coordinate> {
        let latitude = fields.get(self.fields.get(ROLE_LATITUDE)?)?.parse().ok()?;
        let longitude = fields.get(self.fields.get(ROLE_LONGITUDE)?)?.parse().ok()?;
        Some(Coordinate {
            timestamp_ns,
            latitude,
            longitude,
        })
    }
}
