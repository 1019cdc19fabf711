#![deny(missing_docs)]

//! Core library for the Paperchat document question answering server.

/// Answer synthesis and citation formatting.
pub mod answer;
/// HTTP routing and REST handlers.
pub mod api;
/// Chat orchestration over retrieval and synthesis.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and the Ollama adapter.
pub mod embedding;
/// Per-page text extraction from uploaded documents.
pub mod extract;
/// Ingestion pipeline, chunking, and job status tracking.
pub mod ingest;
/// Completion client abstraction for answer generation.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query metrics helpers.
pub mod metrics;
/// Similarity retrieval over the chunk store.
pub mod retrieval;
/// Top-level service composition shared by all surfaces.
pub mod service;
/// Qdrant-backed chunk storage.
pub mod store;
