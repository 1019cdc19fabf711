//! Shared types used by the chunk store and its helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Payload layout version written with every chunk.
pub const CHUNK_SCHEMA_VERSION: u64 = 1;

/// Errors returned while interacting with the chunk store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Backend responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the backend.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Chunk record prepared by the ingestion pipeline, ready for persistence.
#[derive(Debug, Clone)]
pub struct NewChunk {
    /// Identifier of the source document.
    pub doc_id: String,
    /// Topic the document belongs to; unset until assignment.
    pub topic_id: Option<String>,
    /// 0-based page number within the document.
    pub page_no: usize,
    /// 0-based chunk order within the page.
    pub para_no: usize,
    /// Chunk text content.
    pub text: String,
    /// Embedding vector produced for the chunk.
    pub embedding: Vec<f32>,
}

/// Chunk record as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    /// Identifier assigned at insertion time.
    pub id: String,
    /// Identifier of the source document.
    pub doc_id: String,
    /// Topic the document belongs to, when assigned.
    pub topic_id: Option<String>,
    /// 0-based page number within the document.
    pub page_no: usize,
    /// 0-based chunk order within the page.
    pub para_no: usize,
    /// Chunk text content.
    pub text: String,
}

/// A stored chunk paired with the similarity score computed at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The chunk read back from the store.
    pub chunk: StoredChunk,
    /// Cosine similarity against the query vector, in `0.0..=1.0`.
    pub score: f32,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
        #[serde(default)]
        _count: Option<usize>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
