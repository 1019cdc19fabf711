//! Qdrant vector store integration for chunk persistence and similarity search.

pub mod client;
pub mod filters;
mod payload;
pub mod types;

pub use client::QdrantChunkStore;
pub use filters::build_topic_filter;
pub use types::{CHUNK_SCHEMA_VERSION, NewChunk, ScoredChunk, StoreError, StoredChunk};

use async_trait::async_trait;

/// Interface implemented by chunk storage backends.
///
/// Ingestion writes through [`ChunkStore::insert_chunks`] exactly once per job;
/// retrieval reads through [`ChunkStore::search`] concurrently with ongoing writes.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Persist a batch of chunks atomically and return their generated ids.
    ///
    /// Either the whole batch lands or the call fails; partial writes must not
    /// become visible to search.
    async fn insert_chunks(&self, chunks: Vec<NewChunk>) -> Result<Vec<String>, StoreError>;

    /// Return up to `limit` nearest chunks for `vector`, restricted to `topic_id`
    /// when provided, ordered by descending similarity.
    async fn search(
        &self,
        vector: Vec<f32>,
        topic_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;
}
