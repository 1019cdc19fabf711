//! Query-time retrieval: embed, search, filter by score, truncate to top-k.

use crate::embedding::{EmbeddingClient, EmbeddingError};
use crate::store::{ChunkStore, ScoredChunk, StoreError};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;

/// Extra candidates fetched per requested result, so that threshold rejection
/// does not starve the result set when scores cluster near the cutoff.
const CANDIDATE_POOL_FACTOR: usize = 3;

/// Errors encountered while resolving a retrieval request.
///
/// These never reach chat callers: [`RetrievalEngine::retrieve`] degrades to an
/// empty result set instead.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Query embedding could not be produced.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Similarity search against the chunk store failed.
    #[error("Chunk search failed: {0}")]
    Store(#[from] StoreError),
}

/// Stateless retrieval engine shared by chat and raw chunk search.
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn ChunkStore>,
}

impl RetrievalEngine {
    /// Build an engine over the shared embedding client and chunk store.
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn ChunkStore>) -> Self {
        Self { embedder, store }
    }

    /// Return the best-scoring chunks for `query`, highest similarity first.
    ///
    /// Chunks scoring below `score_threshold` are excluded even when that yields
    /// fewer than `top_k` results. Failures are logged and degrade to an empty
    /// sequence so a chat request can still produce a source-less answer.
    pub async fn retrieve(
        &self,
        query: &str,
        topic_id: Option<&str>,
        top_k: usize,
        score_threshold: f32,
    ) -> Vec<ScoredChunk> {
        match self
            .try_retrieve(query, topic_id, top_k, score_threshold)
            .await
        {
            Ok(chunks) => chunks,
            Err(error) => {
                tracing::warn!(error = %error, topic_id = ?topic_id, "Retrieval degraded to empty result");
                Vec::new()
            }
        }
    }

    /// Probe the retrieval stack end to end; used by the health surface.
    pub async fn probe(&self) -> Result<(), RetrievalError> {
        self.try_retrieve("health probe", None, 1, 1.0).await?;
        Ok(())
    }

    async fn try_retrieve(
        &self,
        query: &str,
        topic_id: Option<&str>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let candidate_count = top_k.saturating_mul(CANDIDATE_POOL_FACTOR);
        let candidates = self.store.search(vector, topic_id, candidate_count).await?;
        let fetched = candidates.len();

        let mut hits: Vec<ScoredChunk> = candidates
            .into_iter()
            .filter(|candidate| candidate.score >= score_threshold)
            .collect();
        hits.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(top_k);

        tracing::debug!(
            topic_id = ?topic_id,
            top_k,
            score_threshold = %score_threshold,
            candidates = fetched,
            returned = hits.len(),
            "Retrieval completed"
        );
        Ok(hits)
    }
}
