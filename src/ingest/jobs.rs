//! Ingestion job records and the status store contract.
//!
//! Job status moves `pending -> processing -> {done | failed}` and never leaves a
//! terminal state. The store enforces that monotonicity so an at-least-once dispatcher
//! redelivering a finished job cannot resurrect it.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Lifecycle state of one document ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job accepted at upload time, not yet picked up by a worker.
    Pending,
    /// Worker is extracting, chunking, and embedding the document.
    Processing,
    /// All chunks stored; `chunk_ids` is populated.
    Done,
    /// Job abandoned; `error` carries the failure message.
    Failed,
}

impl JobStatus {
    /// Whether the status is terminal; terminal jobs never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Done | JobStatus::Failed => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Persistent record for one document's processing lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionJob {
    /// Caller-assigned identifier, also the idempotency key for re-dispatch.
    pub job_id: String,
    /// Identifier of the document being processed.
    pub doc_id: String,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Ids of the stored chunks; populated when the job completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_ids: Option<Vec<String>>,
    /// Failure message; populated when the job fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Errors raised by job status stores.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// Requested transition would move a job backwards or out of a terminal state.
    #[error("job {job_id} may not move from {from} to {to}")]
    InvalidTransition {
        /// Identifier of the affected job.
        job_id: String,
        /// Status currently recorded for the job.
        from: JobStatus,
        /// Status the caller attempted to set.
        to: JobStatus,
    },
    /// No job exists under the supplied identifier.
    #[error("unknown job: {0}")]
    UnknownJob(String),
    /// Underlying storage failed.
    #[error("job status backend failed: {0}")]
    Backend(String),
}

/// Interface implemented by job status backends.
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    /// Create a job in `pending`. Creating an already-known job id is a no-op,
    /// preserving idempotency-key semantics for duplicate uploads.
    async fn create(&self, job_id: &str, doc_id: &str) -> Result<(), JobStoreError>;

    /// Advance a job's status, optionally recording chunk ids or a failure message.
    async fn set_status(
        &self,
        job_id: &str,
        status: JobStatus,
        chunk_ids: Option<Vec<String>>,
        error: Option<String>,
    ) -> Result<(), JobStoreError>;

    /// Fetch the current job record, or `None` when the id is unknown.
    async fn get(&self, job_id: &str) -> Result<Option<IngestionJob>, JobStoreError>;
}

/// In-process job status store backing the bundled single-node deployment.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, IngestionJob>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStatusStore for InMemoryJobStore {
    async fn create(&self, job_id: &str, doc_id: &str) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        jobs.entry(job_id.to_string())
            .or_insert_with(|| IngestionJob {
                job_id: job_id.to_string(),
                doc_id: doc_id.to_string(),
                status: JobStatus::Pending,
                chunk_ids: None,
                error: None,
            });
        Ok(())
    }

    async fn set_status(
        &self,
        job_id: &str,
        status: JobStatus,
        chunk_ids: Option<Vec<String>>,
        error: Option<String>,
    ) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::UnknownJob(job_id.to_string()))?;

        if status.rank() <= job.status.rank() {
            return Err(JobStoreError::InvalidTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to: status,
            });
        }

        job.status = status;
        if chunk_ids.is_some() {
            job.chunk_ids = chunk_ids;
        }
        if error.is_some() {
            job.error = error;
        }
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<IngestionJob>, JobStoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }
}
