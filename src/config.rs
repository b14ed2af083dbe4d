//! Layered settings
//!
//! Priority, lowest first:
//! 1. Defaults (embedded in structs)
//! 2. TOML file (optional)
//! 3. `MCAP_EXPORT__SECTION__KEY` environment variables

use crate::error::Result;
use crate::export::{default_keywords, ExportOptions};
use crate::flatten::FlattenDepth;
use crate::jobs::{PipelineRunner, RepairTool, RetryPolicy};
use crate::roles::FieldRoles;
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "MCAP_EXPORT";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub recovery: RecoverySettings,
    #[serde(default)]
    pub jobs: JobSettings,
    /// Role mapping for the parse path
    #[serde(default)]
    pub roles: Option<FieldRoles>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Markers for the tvn keyword profile
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub depth: FlattenDepth,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            depth: FlattenDepth::default(),
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySettings {
    #[serde(default = "default_program")]
    pub program: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_program() -> PathBuf {
    PathBuf::from(crate::jobs::recovery::DEFAULT_REPAIR_PROGRAM)
}

fn default_timeout_secs() -> u64 {
    crate::jobs::recovery::DEFAULT_REPAIR_TIMEOUT.as_secs()
}

fn default_max_retries() -> u32 {
    crate::jobs::retry::DEFAULT_MAX_RETRIES
}

fn default_backoff_secs() -> u64 {
    crate::jobs::retry::DEFAULT_BACKOFF_BASE.as_secs()
}

impl Settings {
    /// Load settings from an optional TOML file plus environment overrides
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
            } else {
                tracing::warn!(
                    "Configuration file not found at {}, using defaults and environment overrides",
                    path.display()
                );
            }
            builder = builder.add_source(File::from(path).required(false));
        }

        // MCAP_EXPORT__RECOVERY__TIMEOUT_SECS -> recovery.timeout_secs
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("export.keywords"),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            depth: self.export.depth,
            profile: None,
            keywords: self.export.keywords.clone(),
            output_dir: self.export.output_dir.clone(),
        }
    }

    pub fn repair_tool(&self) -> RepairTool {
        RepairTool::new(
            self.recovery.program.clone(),
            Duration::from_secs(self.recovery.timeout_secs),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.jobs.max_retries, Duration::from_secs(self.jobs.backoff_secs))
    }

    pub fn pipeline_runner(&self) -> PipelineRunner {
        PipelineRunner::new(self.repair_tool(), self.roles.clone(), self.export_options())
    }
}
