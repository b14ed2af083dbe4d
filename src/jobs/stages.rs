use super::recovery::RepairTool;
use super::types::SourceRef;
use crate::error::{ExportError, Result};
use crate::export::{convert, ExportOptions, ExportReport};
use crate::parser::parse_log;
use crate::roles::FieldRoles;
use crate::types::ParseResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// The work behind each job kind
///
/// The orchestrator only sequences, retries and records status; everything
/// that touches files goes through this trait.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Repair `source.original` into `source.recovered`
    async fn recover(&self, source: &SourceRef) -> Result<PathBuf>;

    async fn parse(&self, path: &Path) -> Result<ParseResult>;

    async fn export(&self, path: &Path, format: &str, output: &Path) -> Result<ExportReport>;
}

/// Stage runner backed by the repair tool, the parse path and the export writers
#[derive(Debug, Clone, Default)]
pub struct PipelineRunner {
    pub repair: RepairTool,
    pub roles: Option<FieldRoles>,
    pub options: ExportOptions,
}

impl PipelineRunner {
    pub fn new(repair: RepairTool, roles: Option<FieldRoles>, options: ExportOptions) -> Self {
        Self {
            repair,
            roles,
            options,
        }
    }
}

#[async_trait]
impl StageRunner for PipelineRunner {
    async fn recover(&self, source: &SourceRef) -> Result<PathBuf> {
        self.repair.repair(&source.original, &source.recovered).await
    }

    async fn parse(&self, path: &Path) -> Result<ParseResult> {
        let path = path.to_path_buf();
        let roles = self.roles.clone();
        tokio::task::spawn_blocking(move || parse_log(&path, roles.as_ref()))
            .await
            .map_err(|e| ExportError::StageAborted(e.to_string()))?
    }

    async fn export(&self, path: &Path, format: &str, output: &Path) -> Result<ExportReport> {
        let path = path.to_path_buf();
        let output = output.to_path_buf();
        let format = format.to_string();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || convert(&path, &output, &format, &options))
            .await
            .map_err(|e| ExportError::StageAborted(e.to_string()))?
    }
}
