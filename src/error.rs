use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading, flattening, exporting or orchestrating logs
#[derive(Debug, Error)]
pub enum ExportError {
    /// Source container does not exist or cannot be read
    #[error("log file not found or unreadable: {0}")]
    NotFound(PathBuf),

    /// Source exists but is not a readable MCAP container
    #[error("corrupt container {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Container has no summary section (usually truncated; run recovery)
    #[error("container {0} has no summary section")]
    MissingSummary(PathBuf),

    /// Requested export format is not one we know how to write
    #[error("unsupported export format: {0} (expected omni, tvn or ld)")]
    UnsupportedFormat(String),

    /// I/O failure with the path that was being read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV writer failure
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// A mapped role path does not exist in the discovered schema
    #[error("role '{role}' maps to '{path}', which is not a field of channel '{channel}'")]
    RoleNotFound {
        role: String,
        path: String,
        channel: String,
    },

    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// External repair tool reported failure
    #[error("{0}")]
    Recovery(String),

    /// External repair tool exceeded its wall-clock bound
    #[error("repair tool timed out after {}s", .0.as_secs())]
    RecoveryTimeout(Duration),

    /// A blocking stage task panicked or was cancelled
    #[error("stage aborted: {0}")]
    StageAborted(String),

    /// Job record refused a status change
    #[error("invalid job transition: {0}")]
    InvalidTransition(String),

    /// Job id unknown to the store
    #[error("unknown job: {0}")]
    UnknownJob(String),
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        ExportError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Whether the orchestrator may spend a retry on this failure
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ExportError::UnsupportedFormat(_)
                | ExportError::InvalidTransition(_)
                | ExportError::UnknownJob(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
