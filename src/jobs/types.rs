use crate::error::{ExportError, Result};
use crate::export::ExportReport;
use crate::types::ParseResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        JobId(id)
    }
}

/// Work a job performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobKind {
    /// Run the external repair tool over the original container
    Recovery,
    /// Summary and role extraction
    Parse,
    /// Conversion to one of the export formats
    Export { format: String, output: PathBuf },
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Recovery => "recovery",
            JobKind::Parse => "parse",
            JobKind::Export { .. } => "export",
        }
    }
}

/// Job status as seen by pollers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            JobStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.write_str("pending"),
            JobStatus::Processing => f.write_str("processing"),
            JobStatus::Completed => f.write_str("completed"),
            JobStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// The logical source of a job: the uploaded container and where its repaired copy goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub original: PathBuf,
    pub recovered: PathBuf,
}

impl SourceRef {
    /// Source whose repaired copy is `<stem>-recovered.mcap` next to the original
    pub fn new(original: impl Into<PathBuf>) -> Self {
        let original = original.into();
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("log");
        let recovered = original.with_file_name(format!("{stem}-recovered.mcap"));
        Self {
            original,
            recovered,
        }
    }

    pub fn with_recovered(mut self, recovered: impl Into<PathBuf>) -> Self {
        self.recovered = recovered.into();
        self
    }

    /// The repaired copy if it exists right now, else the original
    ///
    /// Checked on every call; recovery may complete after a job was created.
    pub fn effective_path(&self) -> &Path {
        if self.recovered.is_file() {
            &self.recovered
        } else {
            &self.original
        }
    }
}

/// Follow-up work a job enqueues when it completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Continuation {
    Parse,
}

impl Continuation {
    pub fn kind(&self) -> JobKind {
        match self {
            Continuation::Parse => JobKind::Parse,
        }
    }
}

/// What a completed job produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobOutput {
    Recovered { path: PathBuf },
    Parsed(ParseResult),
    Exported(ExportReport),
}

/// A job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub source: SourceRef,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Retries performed; the first attempt is not counted
    pub retry_count: u32,
    pub continuation: Option<Continuation>,
    /// Job created from `continuation` after success
    pub continuation_job: Option<JobId>,
    pub output: Option<JobOutput>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(source: SourceRef, kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            source,
            kind,
            status: JobStatus::Pending,
            retry_count: 0,
            continuation: None,
            continuation_job: None,
            output: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_continuation(mut self, continuation: Continuation) -> Self {
        self.continuation = Some(continuation);
        self
    }

    /// pending -> processing
    pub fn start(&mut self) -> Result<()> {
        match self.status {
            JobStatus::Pending => self.transition(JobStatus::Processing),
            _ => Err(self.refuse("start")),
        }
    }

    /// error -> processing, counting one retry
    pub fn retry(&mut self) -> Result<()> {
        match self.status {
            JobStatus::Error(_) => {
                self.retry_count += 1;
                self.transition(JobStatus::Processing)
            }
            _ => Err(self.refuse("retry")),
        }
    }

    /// processing -> completed
    pub fn complete(&mut self, output: JobOutput) -> Result<()> {
        match self.status {
            JobStatus::Processing => {
                self.output = Some(output);
                self.transition(JobStatus::Completed)
            }
            _ => Err(self.refuse("complete")),
        }
    }

    /// processing -> error
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        match self.status {
            JobStatus::Processing => self.transition(JobStatus::Error(message.into())),
            _ => Err(self.refuse("fail")),
        }
    }

    pub fn status_update(&self) -> StatusUpdate {
        StatusUpdate {
            status: self.status.clone(),
            error_message: self.status.error_message().map(str::to_string),
            continuation_job_id: self.continuation_job,
        }
    }

    fn transition(&mut self, status: JobStatus) -> Result<()> {
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn refuse(&self, action: &str) -> ExportError {
        ExportError::InvalidTransition(format!(
            "cannot {action} {} job {} while {}",
            self.kind.name(),
            self.id,
            self.status
        ))
    }
}

/// What a status poller receives for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub continuation_job_id: Option<JobId>,
}
