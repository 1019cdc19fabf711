//! Worker-side ingestion pipeline: extract, chunk, embed, and store one document.

use crate::embedding::{EmbeddingClient, EmbeddingError};
use crate::extract::{ExtractionError, PageExtractor};
use crate::ingest::chunker::{ChunkError, split_page};
use crate::ingest::jobs::{JobStatus, JobStatusStore, JobStoreError};
use crate::metrics::ServiceMetrics;
use crate::store::{ChunkStore, NewChunk, StoreError};
use futures_util::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Reference to a spooled document awaiting ingestion.
#[derive(Debug, Clone)]
pub struct DocumentRef {
    /// Identifier the document is cited under.
    pub doc_id: String,
    /// Location of the spooled document bytes.
    pub path: PathBuf,
}

/// Character budget applied when chunking page text.
#[derive(Debug, Clone, Copy)]
pub struct ChunkBudget {
    /// Upper bound on chunk length in characters.
    pub max_chars: usize,
    /// Characters of trailing context carried into the next chunk.
    pub overlap_chars: usize,
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Spooled document bytes could not be read.
    #[error("Failed to read document: {0}")]
    Read(#[from] std::io::Error),
    /// Document could not be split into page text.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractionError),
    /// A page could not be chunked under the configured budget.
    #[error("Failed to chunk page {page_no}: {source}")]
    Chunking {
        /// Page that failed to chunk.
        page_no: usize,
        /// Underlying chunker error.
        #[source]
        source: ChunkError,
    },
    /// Embedding provider failed for one of the chunks.
    #[error("Failed to embed chunk: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Chunk store rejected the bulk write.
    #[error("Failed to store chunks: {0}")]
    Storage(#[from] StoreError),
    /// Job status store failed while recording progress.
    #[error("Failed to update job status: {0}")]
    JobStatus(#[from] JobStoreError),
}

/// Coordinates the full ingestion flow for one job: page extraction, chunking,
/// embedding, a single bulk store write, and job status bookkeeping.
///
/// The pipeline owns no queue and performs no retries; it is invoked by an
/// at-least-once dispatcher with the job id as the idempotency key. Construct it
/// once at process start and share it through an `Arc`.
pub struct IngestionPipeline {
    extractor: Box<dyn PageExtractor>,
    embedder: Arc<dyn EmbeddingClient>,
    chunk_store: Arc<dyn ChunkStore>,
    job_store: Arc<dyn JobStatusStore>,
    budget: ChunkBudget,
    metrics: Arc<ServiceMetrics>,
}

impl IngestionPipeline {
    /// Build a pipeline from its collaborators.
    pub fn new(
        extractor: Box<dyn PageExtractor>,
        embedder: Arc<dyn EmbeddingClient>,
        chunk_store: Arc<dyn ChunkStore>,
        job_store: Arc<dyn JobStatusStore>,
        budget: ChunkBudget,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            extractor,
            embedder,
            chunk_store,
            job_store,
            budget,
            metrics,
        }
    }

    /// Process one document to a terminal job status.
    ///
    /// Re-dispatch of a job already in `done` or `failed` is a no-op. Any failure
    /// during extraction, chunking, embedding, or storage marks the job `failed`
    /// with a best-effort status write and propagates the error to the dispatcher.
    /// Because chunks land in a single bulk write, a failed run leaves nothing
    /// visible to retrieval.
    pub async fn run(&self, document: &DocumentRef, job_id: &str) -> Result<(), IngestError> {
        if let Some(job) = self.job_store.get(job_id).await?
            && job.status.is_terminal()
        {
            tracing::info!(
                job_id,
                status = %job.status,
                "Job already terminal; skipping re-dispatch"
            );
            return Ok(());
        }

        self.job_store
            .set_status(job_id, JobStatus::Processing, None, None)
            .await?;

        match self.process(document).await {
            Ok(chunk_ids) => {
                let chunk_count = chunk_ids.len();
                self.job_store
                    .set_status(job_id, JobStatus::Done, Some(chunk_ids), None)
                    .await?;
                self.metrics.record_document(chunk_count as u64);
                tracing::info!(
                    job_id,
                    doc_id = %document.doc_id,
                    chunks = chunk_count,
                    "Document ingested"
                );
                Ok(())
            }
            Err(error) => {
                self.metrics.record_failed_job();
                tracing::error!(
                    job_id,
                    doc_id = %document.doc_id,
                    error = %error,
                    "Ingestion failed"
                );
                if let Err(status_error) = self
                    .job_store
                    .set_status(job_id, JobStatus::Failed, None, Some(error.to_string()))
                    .await
                {
                    tracing::error!(
                        job_id,
                        error = %status_error,
                        "Failed to record failed job status"
                    );
                }
                Err(error)
            }
        }
    }

    /// Extract, chunk, and embed every page, then persist all chunks in one write.
    async fn process(&self, document: &DocumentRef) -> Result<Vec<String>, IngestError> {
        let bytes = tokio::fs::read(&document.path).await?;
        let pages = self.extractor.extract_pages(&bytes)?;
        tracing::debug!(doc_id = %document.doc_id, pages = pages.len(), "Document extracted");

        let mut records = Vec::new();
        for (page_no, page_text) in pages.iter().enumerate() {
            let chunks = split_page(page_text, self.budget.max_chars, self.budget.overlap_chars)
                .map_err(|source| IngestError::Chunking { page_no, source })?;
            if chunks.is_empty() {
                tracing::debug!(doc_id = %document.doc_id, page_no, "Page produced no chunks");
                continue;
            }

            // Chunks within a page embed concurrently; the bulk write below waits on all.
            let embeddings =
                try_join_all(chunks.iter().map(|chunk| self.embedder.embed(&chunk.text))).await?;

            for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
                records.push(NewChunk {
                    doc_id: document.doc_id.clone(),
                    topic_id: None,
                    page_no,
                    para_no: chunk.local_index,
                    text: chunk.text,
                    embedding,
                });
            }
        }

        let chunk_ids = self.chunk_store.insert_chunks(records).await?;
        Ok(chunk_ids)
    }
}
