use super::retry::RetryPolicy;
use super::stages::StageRunner;
use super::store::JobStore;
use super::types::{Continuation, Job, JobId, JobKind, JobOutput, SourceRef, StatusUpdate};
use crate::error::Result;
use crate::export::ExportFormat;
use std::sync::Arc;
use tracing::{info, warn};

/// Sequences recovery, parse and export jobs with bounded retries
///
/// One call to [`Orchestrator::run`] owns a job until it is terminal. Status
/// is written to the shared [`JobStore`] at every step so it can be polled
/// while the job runs.
pub struct Orchestrator {
    store: Arc<JobStore>,
    runner: Arc<dyn StageRunner>,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn StageRunner>, policy: RetryPolicy) -> Self {
        Self::with_store(Arc::new(JobStore::new()), runner, policy)
    }

    pub fn with_store(store: Arc<JobStore>, runner: Arc<dyn StageRunner>, policy: RetryPolicy) -> Self {
        Self {
            store,
            runner,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn submit(&self, source: SourceRef, kind: JobKind) -> JobId {
        let job = Job::new(source, kind);
        info!(job_id = %job.id, kind = job.kind.name(), "Job submitted");
        self.store.insert(job)
    }

    /// Recovery job that enqueues a parse of the same source when it succeeds
    pub fn submit_recovery(&self, source: SourceRef) -> JobId {
        let job = Job::new(source, JobKind::Recovery).with_continuation(Continuation::Parse);
        info!(job_id = %job.id, "Recovery job submitted");
        self.store.insert(job)
    }

    pub fn status(&self, id: JobId) -> Result<StatusUpdate> {
        self.store.status(id)
    }

    /// Drive one pending job to `completed` or a permanent `error`
    ///
    /// Stage failures are recorded on the job, not returned; the `Err` case
    /// is reserved for unknown ids and refused transitions.
    pub async fn run(&self, id: JobId) -> Result<StatusUpdate> {
        self.store.update(id, Job::start)?;

        loop {
            let job = self.store.get(id)?;
            info!(
                job_id = %id,
                kind = job.kind.name(),
                attempt = job.retry_count + 1,
                "Running job"
            );

            match self.execute(&job).await {
                Ok(output) => {
                    if let Some(next) = self.store.complete(id, output)? {
                        info!(job_id = %id, continuation = %next, "Job completed; continuation enqueued");
                    } else {
                        info!(job_id = %id, "Job completed");
                    }
                    return self.store.status(id);
                }
                Err(e) => {
                    let message = e.to_string();
                    let retry_count = self.store.update(id, |job| {
                        job.fail(message.clone())?;
                        Ok(job.retry_count)
                    })?;

                    if !e.is_retryable() || !self.policy.can_retry(retry_count) {
                        warn!(job_id = %id, retries = retry_count, error = %message, "Job failed permanently");
                        return self.store.status(id);
                    }

                    let delay = self.policy.delay(retry_count);
                    warn!(
                        job_id = %id,
                        error = %message,
                        delay_secs = delay.as_secs(),
                        "Job attempt failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    self.store.update(id, Job::retry)?;
                }
            }
        }
    }

    /// Run a job, then each continuation it enqueued
    pub async fn run_chain(&self, id: JobId) -> Result<Vec<(JobId, StatusUpdate)>> {
        let mut results = Vec::new();
        let mut next = Some(id);
        while let Some(id) = next {
            let status = self.run(id).await?;
            next = status.continuation_job_id;
            results.push((id, status));
        }
        Ok(results)
    }

    async fn execute(&self, job: &Job) -> Result<JobOutput> {
        match &job.kind {
            JobKind::Recovery => {
                let path = self.runner.recover(&job.source).await?;
                Ok(JobOutput::Recovered { path })
            }
            JobKind::Parse => {
                let parsed = self.runner.parse(job.source.effective_path()).await?;
                Ok(JobOutput::Parsed(parsed))
            }
            JobKind::Export { format, output } => {
                // reject the format before touching the source
                format.parse::<ExportFormat>()?;
                let report = self
                    .runner
                    .export(job.source.effective_path(), format, output)
                    .await?;
                Ok(JobOutput::Exported(report))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::export::ExportReport;
    use crate::jobs::types::JobStatus;
    use crate::types::ParseResult;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Fails the first `failures` calls, then succeeds
    #[derive(Default)]
    struct FakeRunner {
        failures: AtomicU32,
        calls: AtomicU32,
        exports: AtomicU32,
        parsed: Mutex<Vec<PathBuf>>,
    }

    impl FakeRunner {
        fn failing(times: u32) -> Self {
            Self {
                failures: AtomicU32::new(times),
                ..Self::default()
            }
        }

        fn attempt(&self) -> crate::error::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(ExportError::Decode(format!("attempt {call} failed")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StageRunner for FakeRunner {
        async fn recover(&self, source: &SourceRef) -> crate::error::Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.store(0, Ordering::SeqCst);
                return Err(ExportError::Recovery("invalid magic".into()));
            }
            std::fs::write(&source.recovered, b"repaired").map_err(|e| ExportError::io(&source.recovered, e))?;
            Ok(source.recovered.clone())
        }

        async fn parse(&self, path: &Path) -> crate::error::Result<ParseResult> {
            self.attempt()?;
            self.parsed.lock().unwrap().push(path.to_path_buf());
            Ok(ParseResult {
                source: path.to_path_buf(),
                ..ParseResult::default()
            })
        }

        async fn export(&self, _path: &Path, format: &str, output: &Path) -> crate::error::Result<ExportReport> {
            self.exports.fetch_add(1, Ordering::SeqCst);
            let format: ExportFormat = format.parse()?;
            self.attempt()?;
            Ok(ExportReport {
                format,
                output: output.to_path_buf(),
                messages: 0,
                rows: 0,
                columns: 0,
                is_data: format.is_data(),
            })
        }
    }

    fn orchestrator(runner: Arc<FakeRunner>) -> Orchestrator {
        Orchestrator::new(runner, RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let runner = Arc::new(FakeRunner::failing(2));
        let orchestrator = orchestrator(runner.clone());
        let id = orchestrator.submit(SourceRef::new("/logs/a.mcap"), JobKind::Parse);

        let started = tokio::time::Instant::now();
        let status = orchestrator.run(id).await.unwrap();

        assert_eq!(status.status, JobStatus::Completed);
        assert_eq!(status.error_message, None);
        assert_eq!(orchestrator.store().get(id).unwrap().retry_count, 2);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
        // 60s + 120s of backoff
        assert_eq!(started.elapsed().as_secs(), 180);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let runner = Arc::new(FakeRunner::failing(4));
        let orchestrator = orchestrator(runner.clone());
        let id = orchestrator.submit(SourceRef::new("/logs/a.mcap"), JobKind::Parse);

        let status = orchestrator.run(id).await.unwrap();

        assert_eq!(status.status, JobStatus::Error("decode error: attempt 4 failed".into()));
        assert_eq!(status.error_message.as_deref(), Some("decode error: attempt 4 failed"));
        assert_eq!(orchestrator.store().get(id).unwrap().retry_count, 3);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_format_not_retried() {
        let runner = Arc::new(FakeRunner::default());
        let orchestrator = orchestrator(runner.clone());
        let id = orchestrator.submit(
            SourceRef::new("/logs/a.mcap"),
            JobKind::Export {
                format: "xlsx".into(),
                output: PathBuf::from("/out/a.xlsx"),
            },
        );

        let started = tokio::time::Instant::now();
        let status = orchestrator.run(id).await.unwrap();
        assert!(matches!(status.status, JobStatus::Error(_)));
        assert_eq!(orchestrator.store().get(id).unwrap().retry_count, 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(runner.exports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_enqueues_parse_of_repaired_file() {
        let dir = TempDir::new().unwrap();
        let source = SourceRef::new(dir.path().join("run.mcap"));
        let runner = Arc::new(FakeRunner::default());
        let orchestrator = orchestrator(runner.clone());

        let id = orchestrator.submit_recovery(source.clone());
        let results = orchestrator.run_chain(id).await.unwrap();

        assert_eq!(results.len(), 2);
        let (_, recovery) = &results[0];
        assert_eq!(recovery.status, JobStatus::Completed);
        let parse_id = recovery.continuation_job_id.unwrap();
        assert_eq!(results[1].0, parse_id);
        assert_eq!(results[1].1.status, JobStatus::Completed);
        assert_eq!(*runner.parsed.lock().unwrap(), vec![source.recovered.clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_failure_enqueues_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(FakeRunner::failing(1));
        let orchestrator = Orchestrator::new(runner.clone(), RetryPolicy::new(0, Duration::from_secs(60)));

        let id = orchestrator.submit_recovery(SourceRef::new(dir.path().join("run.mcap")));
        let results = orchestrator.run_chain(id).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.error_message.as_deref(), Some("invalid magic"));
        assert_eq!(results[0].1.continuation_job_id, None);
        assert_eq!(orchestrator.store().len(), 1);
    }

    #[tokio::test]
    async fn test_parse_prefers_original_without_repair() {
        let dir = TempDir::new().unwrap();
        let source = SourceRef::new(dir.path().join("run.mcap"));
        let runner = Arc::new(FakeRunner::default());
        let orchestrator = orchestrator(runner.clone());

        let id = orchestrator.submit(source.clone(), JobKind::Parse);
        orchestrator.run(id).await.unwrap();
        assert_eq!(*runner.parsed.lock().unwrap(), vec![source.original.clone()]);
    }

    #[tokio::test]
    async fn test_run_twice_is_refused() {
        let orchestrator = orchestrator(Arc::new(FakeRunner::default()));
        let id = orchestrator.submit(SourceRef::new("a.mcap"), JobKind::Parse);
        orchestrator.run(id).await.unwrap();
        assert!(matches!(
            orchestrator.run(id).await,
            Err(ExportError::InvalidTransition(_))
        ));
        assert!(matches!(
            orchestrator.run(JobId::new()).await,
            Err(ExportError::UnknownJob(_))
        ));
    }
}
