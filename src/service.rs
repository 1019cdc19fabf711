//! Top-level service wiring the ingestion pipeline and chat orchestrator together.
//!
//! The HTTP surface talks to [`ServiceApi`] only; everything behind it is plain
//! library code so tests can drive the same behavior without a socket.

use crate::answer::ChatAnswer;
use crate::chat::{ChatOrchestrator, SimilarChunk};
use crate::ingest::{DocumentRef, IngestionJob, IngestionPipeline, JobStatusStore, JobStoreError};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::retrieval::RetrievalError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Acknowledgement returned when a document is accepted for processing.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    /// Identifier of the ingestion job tracking this upload.
    pub job_id: String,
    /// Identifier the document will be cited under.
    pub doc_id: String,
}

/// Errors raised while accepting an uploaded document.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Upload did not name the document.
    #[error("doc_id must not be empty")]
    MissingDocId,
    /// Upload carried no document text.
    #[error("document text must not be empty")]
    EmptyDocument,
    /// Spooling the document to disk failed.
    #[error("Failed to spool document: {0}")]
    Spool(#[from] std::io::Error),
    /// Creating the job record failed.
    #[error(transparent)]
    JobStore(#[from] JobStoreError),
}

/// Abstraction over the service used by external surfaces.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// Accept a document, create its job in `pending`, and start ingestion in the
    /// background. Returns as soon as the job is enqueued.
    async fn enqueue_document(
        &self,
        doc_id: String,
        text: String,
    ) -> Result<UploadReceipt, UploadError>;

    /// Fetch the ingestion job record for a status query.
    async fn job_status(&self, job_id: &str) -> Result<Option<IngestionJob>, JobStoreError>;

    /// Answer a question from the document library.
    async fn chat(
        &self,
        query: &str,
        topic_id: Option<&str>,
        top_k: Option<usize>,
        include_sources: bool,
    ) -> ChatAnswer;

    /// Return the raw chunks most similar to a query.
    async fn similar_chunks(
        &self,
        query: &str,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<SimilarChunk>;

    /// Probe the retrieval stack for the health surface.
    async fn probe_retrieval(&self) -> Result<(), RetrievalError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Process-wide service owning the long-lived pipeline and orchestrator handles.
///
/// Construct once near process start and share through an `Arc`.
pub struct PaperchatService {
    pipeline: Arc<IngestionPipeline>,
    orchestrator: ChatOrchestrator,
    job_store: Arc<dyn JobStatusStore>,
    metrics: Arc<ServiceMetrics>,
    spool_dir: PathBuf,
}

impl PaperchatService {
    /// Build the service from its composed parts.
    pub fn new(
        pipeline: Arc<IngestionPipeline>,
        orchestrator: ChatOrchestrator,
        job_store: Arc<dyn JobStatusStore>,
        metrics: Arc<ServiceMetrics>,
        spool_dir: PathBuf,
    ) -> Self {
        Self {
            pipeline,
            orchestrator,
            job_store,
            metrics,
            spool_dir,
        }
    }
}

#[async_trait]
impl ServiceApi for PaperchatService {
    async fn enqueue_document(
        &self,
        doc_id: String,
        text: String,
    ) -> Result<UploadReceipt, UploadError> {
        let doc_id = doc_id.trim().to_string();
        if doc_id.is_empty() {
            return Err(UploadError::MissingDocId);
        }
        if text.trim().is_empty() {
            return Err(UploadError::EmptyDocument);
        }

        let job_id = Uuid::new_v4().to_string();
        let path = self.spool_dir.join(format!("{job_id}.txt"));
        tokio::fs::create_dir_all(&self.spool_dir).await?;
        tokio::fs::write(&path, text.as_bytes()).await?;

        self.job_store.create(&job_id, &doc_id).await?;
        tracing::info!(job_id = %job_id, doc_id = %doc_id, "Document accepted for ingestion");

        // In-process stand-in for the external dispatcher. The pipeline records
        // failures on the job, so the handle's own result carries nothing new.
        let pipeline = Arc::clone(&self.pipeline);
        let document = DocumentRef {
            doc_id: doc_id.clone(),
            path,
        };
        let spawned_job_id = job_id.clone();
        tokio::spawn(async move {
            let _ = pipeline.run(&document, &spawned_job_id).await;
        });

        Ok(UploadReceipt { job_id, doc_id })
    }

    async fn job_status(&self, job_id: &str) -> Result<Option<IngestionJob>, JobStoreError> {
        self.job_store.get(job_id).await
    }

    async fn chat(
        &self,
        query: &str,
        topic_id: Option<&str>,
        top_k: Option<usize>,
        include_sources: bool,
    ) -> ChatAnswer {
        let answer = self
            .orchestrator
            .chat(query, topic_id, top_k, include_sources)
            .await;
        self.metrics.record_question();
        answer
    }

    async fn similar_chunks(
        &self,
        query: &str,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<SimilarChunk> {
        self.orchestrator
            .get_similar_chunks(query, topic_id, limit)
            .await
    }

    async fn probe_retrieval(&self) -> Result<(), RetrievalError> {
        self.orchestrator.probe().await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
