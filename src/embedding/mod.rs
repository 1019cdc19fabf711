//! Embedding client abstraction and the Ollama-backed adapter.
//!
//! The adapter issues one HTTP request per chunk and performs no retries; retry policy
//! belongs to the caller, which must be able to tell a failed embedding apart from a
//! failed document. The client holds no mutable state, so one instance can serve
//! concurrent embedding calls across chunks and queries.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider endpoint was unreachable or returned a non-success status.
    #[error("Embedding endpoint unavailable: {0}")]
    Unavailable(String),
    /// Provider responded without a usable embedding vector.
    #[error("Embedding response malformed: {0}")]
    Malformed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for the supplied text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Embedding client backed by a local Ollama runtime.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Construct a client for the given Ollama base URL and embedding model.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent("paperchat/embed")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let payload = json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingError::Unavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Unavailable(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaEmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingError::Malformed(format!("failed to decode Ollama response: {error}"))
        })?;

        if body.embedding.is_empty() {
            return Err(EmbeddingError::Malformed(
                "response contained no embedding values".into(),
            ));
        }

        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn embed_returns_vector_on_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embeddings")
                    .json_body(json!({ "model": "all-minilm", "prompt": "hello" }));
                then.status(200)
                    .json_body(json!({ "embedding": [0.1, 0.2, 0.3] }));
            })
            .await;

        let client = OllamaEmbeddingClient::new(server.base_url(), "all-minilm");
        let vector = client.embed("hello").await.expect("embedding");

        mock.assert();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_maps_error_status_to_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(500).body("boom");
            })
            .await;

        let client = OllamaEmbeddingClient::new(server.base_url(), "all-minilm");
        let error = client.embed("hello").await.unwrap_err();
        assert!(matches!(error, EmbeddingError::Unavailable(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn embed_rejects_empty_vector() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200).json_body(json!({ "embedding": [] }));
            })
            .await;

        let client = OllamaEmbeddingClient::new(server.base_url(), "all-minilm");
        let error = client.embed("hello").await.unwrap_err();
        assert!(matches!(error, EmbeddingError::Malformed(_)));
    }
}
