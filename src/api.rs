//! HTTP surface for Paperchat.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents` – Accept a pre-converted document for asynchronous ingestion and
//!   return the job id to poll.
//! - `GET /documents/:job_id/status` – Query the ingestion job state machine.
//! - `POST /chat` – Answer a question from the document library with optional citations.
//! - `POST /chunks/search` – Return raw similar chunks without answer synthesis.
//! - `GET /health` – Probe the retrieval stack.
//! - `GET /metrics` – Observe ingestion and query counters.
//!
//! Handlers stay thin: validation and behavior live behind [`ServiceApi`], so the HTTP
//! layer and tests exercise identical code paths.

use crate::ingest::JobStoreError;
use crate::service::{ServiceApi, UploadError};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the service surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ServiceApi + 'static,
{
    Router::new()
        .route("/documents", post(upload_document::<S>))
        .route("/documents/:job_id/status", get(job_status::<S>))
        .route("/chat", post(chat::<S>))
        .route("/chunks/search", post(search_chunks::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Request body for the `POST /documents` endpoint.
#[derive(Deserialize)]
struct UploadRequest {
    /// Identifier the document will be cited under, typically the filename.
    doc_id: String,
    /// Extracted document text; pages separated by form feed characters.
    text: String,
}

/// Success response for the `POST /documents` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    /// Job id to poll via `GET /documents/:job_id/status`.
    job_id: String,
    /// Document identifier as recorded on the job.
    doc_id: String,
    /// Human-readable acknowledgement.
    message: &'static str,
}

/// Accept a document for asynchronous ingestion.
///
/// Returns `202 Accepted` immediately; ingestion failures are only observable via a
/// subsequent status query, never as a synchronous upload error.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError>
where
    S: ServiceApi,
{
    let receipt = service
        .enqueue_document(request.doc_id, request.text)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            job_id: receipt.job_id,
            doc_id: receipt.doc_id,
            message: "Accepted document for processing",
        }),
    ))
}

/// Report the ingestion job state for a status query.
async fn job_status<S>(
    State(service): State<Arc<S>>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError>
where
    S: ServiceApi,
{
    match service.job_status(&job_id).await? {
        Some(job) => Ok(Json(job).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "not_found" })),
        )
            .into_response()),
    }
}

/// Request body for the `POST /chat` endpoint.
#[derive(Deserialize)]
struct ChatRequest {
    /// User's question.
    query: String,
    /// Optional topic filter applied before similarity search.
    #[serde(default)]
    topic_id: Option<String>,
    /// Optional result count override, clamped server-side.
    #[serde(default)]
    top_k: Option<usize>,
    /// Whether to append citations and per-chunk sources.
    #[serde(default = "default_include_sources")]
    include_sources: bool,
}

fn default_include_sources() -> bool {
    true
}

/// Answer a question from the document library.
async fn chat<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<ChatRequest>,
) -> Json<crate::answer::ChatAnswer>
where
    S: ServiceApi,
{
    let answer = service
        .chat(
            &request.query,
            request.topic_id.as_deref(),
            request.top_k,
            request.include_sources,
        )
        .await;
    Json(answer)
}

/// Request body for the `POST /chunks/search` endpoint.
#[derive(Deserialize)]
struct SimilarChunksRequest {
    /// Search query.
    query: String,
    /// Optional topic filter applied before similarity search.
    #[serde(default)]
    topic_id: Option<String>,
    /// Optional result count override, clamped server-side.
    #[serde(default)]
    limit: Option<usize>,
}

/// Return raw similar chunks without synthesis.
async fn search_chunks<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SimilarChunksRequest>,
) -> Json<Vec<crate::chat::SimilarChunk>>
where
    S: ServiceApi,
{
    let chunks = service
        .similar_chunks(&request.query, request.topic_id.as_deref(), request.limit)
        .await;
    Json(chunks)
}

/// Health probe covering the embedding client and chunk store.
async fn health<S>(State(service): State<Arc<S>>) -> Response
where
    S: ServiceApi,
{
    match service.probe_retrieval().await {
        Ok(()) => Json(json!({ "status": "healthy" })).into_response(),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "error": error.to_string() })),
        )
            .into_response(),
    }
}

/// Return ingestion and query counters for observability.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: ServiceApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    Upload(UploadError),
    JobStore(JobStoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Upload(error @ (UploadError::MissingDocId | UploadError::EmptyDocument)) => {
                (StatusCode::BAD_REQUEST, error.to_string()).into_response()
            }
            AppError::Upload(error) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
            AppError::JobStore(error) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
        }
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        Self::Upload(inner)
    }
}

impl From<JobStoreError> for AppError {
    fn from(inner: JobStoreError) -> Self {
        Self::JobStore(inner)
    }
}
