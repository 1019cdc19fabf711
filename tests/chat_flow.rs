//! Retrieval and chat orchestration scenarios against in-process collaborators.

use async_trait::async_trait;
use paperchat::answer::AnswerSynthesizer;
use paperchat::chat::{ChatLimits, ChatOrchestrator};
use paperchat::embedding::{EmbeddingClient, EmbeddingError};
use paperchat::llm::{CompletionClient, CompletionError, CompletionRequest};
use paperchat::retrieval::RetrievalEngine;
use paperchat::store::{ChunkStore, NewChunk, ScoredChunk, StoreError, StoredChunk};
use std::sync::Arc;

struct FixedEmbedder;

#[async_trait]
impl EmbeddingClient for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![0.5, 0.5])
    }
}

/// Chunk store stub that applies the topic pre-filter the way the backend would.
struct StaticStore {
    results: Vec<ScoredChunk>,
    fail: bool,
}

#[async_trait]
impl ChunkStore for StaticStore {
    async fn insert_chunks(&self, _chunks: Vec<NewChunk>) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn search(
        &self,
        _vector: Vec<f32>,
        topic_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        if self.fail {
            return Err(StoreError::UnexpectedStatus {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: "search offline".into(),
            });
        }
        Ok(self
            .results
            .iter()
            .filter(|scored| match topic_id {
                Some(topic) => scored.chunk.topic_id.as_deref() == Some(topic),
                None => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

struct StubLlm {
    fail: bool,
}

#[async_trait]
impl CompletionClient for StubLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        if self.fail {
            Err(CompletionError::GenerationFailed("model offline".into()))
        } else {
            Ok("The documents say so.".to_string())
        }
    }
}

fn scored(doc_id: &str, page_no: usize, score: f32, topic_id: Option<&str>) -> ScoredChunk {
    ScoredChunk {
        chunk: StoredChunk {
            id: format!("{doc_id}-{page_no}"),
            doc_id: doc_id.to_string(),
            topic_id: topic_id.map(str::to_string),
            page_no,
            para_no: 0,
            text: format!("Text from {doc_id} page {page_no}"),
        },
        score,
    }
}

fn engine(results: Vec<ScoredChunk>, fail: bool) -> RetrievalEngine {
    RetrievalEngine::new(
        Arc::new(FixedEmbedder),
        Arc::new(StaticStore { results, fail }),
    )
}

fn orchestrator(results: Vec<ScoredChunk>, fail_store: bool, fail_llm: bool) -> ChatOrchestrator {
    let synthesizer = AnswerSynthesizer::new(Arc::new(StubLlm { fail: fail_llm }), "llama", 12_000);
    ChatOrchestrator::new(
        engine(results, fail_store),
        synthesizer,
        ChatLimits {
            default_top_k: 10,
            max_top_k: 50,
            score_threshold: 0.7,
        },
    )
}

fn graded_results() -> Vec<ScoredChunk> {
    vec![
        scored("alpha.pdf", 0, 0.9, None),
        scored("beta.pdf", 1, 0.75, None),
        scored("gamma.pdf", 2, 0.6, None),
    ]
}

#[tokio::test]
async fn retrieval_applies_threshold_before_top_k() {
    let engine = engine(graded_results(), false);
    let hits = engine.retrieve("question", None, 10, 0.7).await;

    assert_eq!(hits.len(), 2);
    assert!((hits[0].score - 0.9).abs() < f32::EPSILON);
    assert!((hits[1].score - 0.75).abs() < f32::EPSILON);
}

#[tokio::test]
async fn retrieval_never_returns_mismatched_topics() {
    let results = vec![
        scored("alpha.pdf", 0, 0.9, Some("topic-7")),
        scored("beta.pdf", 0, 0.85, Some("other")),
        scored("gamma.pdf", 0, 0.8, Some("topic-7")),
    ];
    let engine = engine(results, false);
    let hits = engine.retrieve("question", Some("topic-7"), 10, 0.7).await;

    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert_eq!(hit.chunk.topic_id.as_deref(), Some("topic-7"));
    }
}

#[tokio::test]
async fn retrieval_degrades_to_empty_on_store_failure() {
    let engine = engine(graded_results(), true);
    let hits = engine.retrieve("question", None, 10, 0.7).await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn similar_chunks_respects_limit() {
    let orchestrator = orchestrator(graded_results(), false, false);
    let chunks = orchestrator
        .get_similar_chunks("question", None, Some(1))
        .await;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].doc_id, "alpha.pdf");
    assert!((chunks[0].score - 0.9).abs() < f32::EPSILON);
}

#[tokio::test]
async fn chat_appends_deduplicated_citations() {
    let results = vec![
        scored("alpha.pdf", 2, 0.9, None),
        scored("alpha.pdf", 3, 0.85, None),
        scored("beta.pdf", 0, 0.75, None),
    ];
    let orchestrator = orchestrator(results, false, false);
    let answer = orchestrator.chat("question", None, None, true).await;

    assert!(answer.response_text.starts_with("The documents say so."));
    assert!(answer.response_text.contains("**Sources:**"));
    assert!(
        answer
            .response_text
            .contains("[1] Document: alpha.pdf, Page: 2 (Relevance: 0.900)")
    );
    assert!(
        answer
            .response_text
            .contains("[3] Document: beta.pdf (Relevance: 0.750)")
    );
    // Two chunks share alpha.pdf; the citation list carries it once.
    assert_eq!(answer.response_text.matches("alpha.pdf").count(), 1);
    assert_eq!(answer.sources_count, 3);
    assert_eq!(answer.sources.len(), 3);
    assert!(answer.error.is_none());
}

#[tokio::test]
async fn chat_without_sources_omits_citations() {
    let orchestrator = orchestrator(graded_results(), false, false);
    let answer = orchestrator.chat("question", None, None, false).await;

    assert_eq!(answer.response_text, "The documents say so.");
    assert!(answer.sources.is_empty());
    assert_eq!(answer.sources_count, 2);
}

#[tokio::test]
async fn chat_survives_retrieval_failure_with_sourceless_answer() {
    let orchestrator = orchestrator(graded_results(), true, false);
    let answer = orchestrator.chat("question", None, None, true).await;

    assert_eq!(answer.response_text, "The documents say so.");
    assert_eq!(answer.sources_count, 0);
    assert!(answer.sources.is_empty());
    assert!(answer.error.is_none());
}

#[tokio::test]
async fn chat_degrades_to_apology_when_completion_fails() {
    let orchestrator = orchestrator(graded_results(), false, true);
    let answer = orchestrator.chat("question", None, None, true).await;

    assert!(
        answer
            .response_text
            .starts_with("I apologize, but I encountered an error")
    );
    assert!(answer.error.expect("error detail").contains("model offline"));
    assert_eq!(answer.sources_count, 0);
    assert!(answer.sources.is_empty());
}
