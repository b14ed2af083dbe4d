use super::types::{Job, JobId, JobOutput, StatusUpdate};
use crate::error::{ExportError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory job records
///
/// Every mutation locks, applies one closure to one record, and unlocks, so a
/// poller never sees a half-written status.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) -> JobId {
        let id = job.id;
        self.lock().insert(id, job);
        id
    }

    /// Snapshot of a job record
    pub fn get(&self, id: JobId) -> Result<Job> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| ExportError::UnknownJob(id.to_string()))
    }

    /// Apply `f` to one record under the lock
    pub fn update<T>(&self, id: JobId, f: impl FnOnce(&mut Job) -> Result<T>) -> Result<T> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| ExportError::UnknownJob(id.to_string()))?;
        f(job)
    }

    /// Complete a job and enqueue its continuation in the same write
    pub fn complete(&self, id: JobId, output: JobOutput) -> Result<Option<JobId>> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| ExportError::UnknownJob(id.to_string()))?;
        job.complete(output)?;

        let Some(continuation) = job.continuation else {
            return Ok(None);
        };
        let next = Job::new(job.source.clone(), continuation.kind());
        let next_id = next.id;
        job.continuation_job = Some(next_id);
        jobs.insert(next_id, next);
        Ok(Some(next_id))
    }

    pub fn status(&self, id: JobId) -> Result<StatusUpdate> {
        self.lock()
            .get(&id)
            .map(Job::status_update)
            .ok_or_else(|| ExportError::UnknownJob(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        // a panicking holder cannot leave a record half-updated
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
