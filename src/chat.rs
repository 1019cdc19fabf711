//! Chat orchestration: retrieval plus synthesis, and raw chunk search.

use crate::answer::{AnswerSynthesizer, ChatAnswer};
use crate::retrieval::{RetrievalEngine, RetrievalError};
use crate::store::ScoredChunk;
use serde::Serialize;

/// Retrieval limits and defaults applied to incoming chat requests.
#[derive(Debug, Clone, Copy)]
pub struct ChatLimits {
    /// Result count applied when a request omits `top_k`.
    pub default_top_k: usize,
    /// Hard ceiling on `top_k` regardless of the request.
    pub max_top_k: usize,
    /// Minimum cosine similarity accepted by retrieval.
    pub score_threshold: f32,
}

/// Plain chunk projection returned by the raw search mode.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarChunk {
    /// Identifier of the source document.
    pub doc_id: String,
    /// 0-based page number within the document.
    pub page_no: usize,
    /// 0-based chunk order within the page.
    pub para_no: usize,
    /// Chunk text content.
    pub text: String,
    /// Similarity score against the query.
    pub score: f32,
    /// Topic the chunk belongs to, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
}

/// Thin composition of the retrieval engine and answer synthesizer.
///
/// Holds no per-request state; one orchestrator serves all concurrent chat and
/// search requests.
pub struct ChatOrchestrator {
    retrieval: RetrievalEngine,
    synthesizer: AnswerSynthesizer,
    limits: ChatLimits,
}

impl ChatOrchestrator {
    /// Build an orchestrator from the shared engines and request limits.
    pub fn new(
        retrieval: RetrievalEngine,
        synthesizer: AnswerSynthesizer,
        limits: ChatLimits,
    ) -> Self {
        Self {
            retrieval,
            synthesizer,
            limits,
        }
    }

    /// Answer a question from the document library, with citations when requested.
    pub async fn chat(
        &self,
        query: &str,
        topic_id: Option<&str>,
        top_k: Option<usize>,
        include_sources: bool,
    ) -> ChatAnswer {
        let top_k = self.clamp_top_k(top_k);
        let chunks = self
            .retrieval
            .retrieve(query, topic_id, top_k, self.limits.score_threshold)
            .await;
        self.synthesizer
            .synthesize(query, topic_id, &chunks, include_sources)
            .await
    }

    /// Return the raw chunks most similar to `query`, without synthesis.
    pub async fn get_similar_chunks(
        &self,
        query: &str,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<SimilarChunk> {
        let limit = self.clamp_top_k(limit);
        self.retrieval
            .retrieve(query, topic_id, limit, self.limits.score_threshold)
            .await
            .into_iter()
            .map(project_chunk)
            .collect()
    }

    /// Probe the retrieval stack; used by the health surface.
    pub async fn probe(&self) -> Result<(), RetrievalError> {
        self.retrieval.probe().await
    }

    fn clamp_top_k(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.limits.default_top_k)
            .clamp(1, self.limits.max_top_k)
    }
}

fn project_chunk(scored: ScoredChunk) -> SimilarChunk {
    SimilarChunk {
        doc_id: scored.chunk.doc_id,
        page_no: scored.chunk.page_no,
        para_no: scored.chunk.para_no,
        text: scored.chunk.text,
        score: scored.score,
        topic_id: scored.chunk.topic_id,
    }
}
