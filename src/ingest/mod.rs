//! Document ingestion: chunking, job status tracking, and the worker pipeline.

pub mod chunker;
pub mod jobs;
pub mod pipeline;

pub use chunker::{ChunkError, PageChunk, split_page};
pub use jobs::{InMemoryJobStore, IngestionJob, JobStatus, JobStatusStore, JobStoreError};
pub use pipeline::{ChunkBudget, DocumentRef, IngestError, IngestionPipeline};
