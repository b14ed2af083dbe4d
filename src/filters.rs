//! Field profiles for selecting export columns
//!
//! A profile decides which discovered field paths make it into an export.
//! Profiles are applied to whole column sets for the wide table and path by
//! path for the streaming long table.

use serde::{Deserialize, Serialize};

/// Column selection profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "profile", content = "keywords")]
pub enum FieldProfile {
    /// Keep every path
    All,
    /// Keep paths whose lowercase text contains any of the keywords
    Keyword(Vec<String>),
    /// Keep nothing; only counts are reported
    None,
}

impl FieldProfile {
    /// Keyword profile; keywords are stored lowercase
    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        FieldProfile::Keyword(
            keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    /// Whether a single path survives this profile
    pub fn retains(&self, path: &str) -> bool {
        match self {
            FieldProfile::All => true,
            FieldProfile::Keyword(keywords) => {
                let lowered = path.to_lowercase();
                keywords.iter().any(|k| lowered.contains(k.as_str()))
            }
            FieldProfile::None => false,
        }
    }
}

/// Filter an ordered path list, preserving order
pub fn filter_paths(paths: &[String], profile: &FieldProfile) -> Vec<String> {
    paths
        .iter()
        .filter(|path| profile.retains(path))
        .cloned()
        .collect()
}
