//! Abstractions for generating chat completions via local providers.
//!
//! The Ollama-backed client mirrors the embedding adapter by issuing HTTP requests
//! directly to the runtime. Callers decide how a failed completion surfaces to the
//! user; the client only classifies the failure.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while attempting answer generation.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider was unreachable or the endpoint is missing.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Prompt assembled by the answer synthesizer.
    pub prompt: String,
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the supplied prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Completion client backed by a local Ollama runtime.
pub struct OllamaCompletionClient {
    http: Client,
    base_url: String,
}

impl OllamaCompletionClient {
    /// Construct a client for the given Ollama base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent("paperchat/chat")
            .build()
            .expect("Failed to construct reqwest::Client for completions");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl CompletionClient for OllamaCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                // Low temperature keeps cited answers close to the excerpts.
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CompletionError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaGenerateResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(CompletionError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn complete_returns_trimmed_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "  An answer.  ",
                    "done": true
                }));
            })
            .await;

        let client = OllamaCompletionClient::new(server.base_url());
        let text = client
            .complete(CompletionRequest {
                model: "llama".into(),
                prompt: "Answer something".into(),
            })
            .await
            .expect("completion");

        mock.assert();
        assert_eq!(text, "An answer.");
    }

    #[tokio::test]
    async fn complete_maps_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let client = OllamaCompletionClient::new(server.base_url());
        let error = client
            .complete(CompletionRequest {
                model: "llama".into(),
                prompt: "Answer something".into(),
            })
            .await
            .expect_err("error response");

        assert!(
            matches!(error, CompletionError::GenerationFailed(message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn complete_rejects_incomplete_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "partial",
                    "done": false
                }));
            })
            .await;

        let client = OllamaCompletionClient::new(server.base_url());
        let error = client
            .complete(CompletionRequest {
                model: "llama".into(),
                prompt: "Answer something".into(),
            })
            .await
            .expect_err("incomplete response");

        assert!(matches!(error, CompletionError::InvalidResponse(_)));
    }
}
