use paperchat::answer::AnswerSynthesizer;
use paperchat::api;
use paperchat::chat::{ChatLimits, ChatOrchestrator};
use paperchat::config;
use paperchat::embedding::{EmbeddingClient, OllamaEmbeddingClient};
use paperchat::extract::FormFeedPages;
use paperchat::ingest::{ChunkBudget, InMemoryJobStore, IngestionPipeline, JobStatusStore};
use paperchat::llm::{CompletionClient, OllamaCompletionClient};
use paperchat::logging;
use paperchat::metrics::ServiceMetrics;
use paperchat::retrieval::RetrievalEngine;
use paperchat::service::PaperchatService;
use paperchat::store::{ChunkStore, QdrantChunkStore};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let embedder: Arc<dyn EmbeddingClient> = Arc::new(OllamaEmbeddingClient::new(
        config.ollama_url.clone(),
        config.embedding_model.clone(),
    ));
    let llm: Arc<dyn CompletionClient> =
        Arc::new(OllamaCompletionClient::new(config.ollama_url.clone()));

    let store = QdrantChunkStore::new(
        &config.qdrant_url,
        config.qdrant_api_key.clone(),
        config.qdrant_collection_name.clone(),
    )
    .expect("Failed to connect to Qdrant");
    store
        .ensure_collection(config.embedding_dimension as u64)
        .await
        .expect("Failed to ensure Qdrant collection exists");
    let chunk_store: Arc<dyn ChunkStore> = Arc::new(store);

    let job_store: Arc<dyn JobStatusStore> = Arc::new(InMemoryJobStore::new());
    let metrics = Arc::new(ServiceMetrics::new());

    tokio::fs::create_dir_all(&config.upload_spool_dir)
        .await
        .expect("Failed to create upload spool directory");

    let pipeline = Arc::new(IngestionPipeline::new(
        Box::new(FormFeedPages),
        Arc::clone(&embedder),
        Arc::clone(&chunk_store),
        Arc::clone(&job_store),
        ChunkBudget {
            max_chars: config.chunk_max_chars,
            overlap_chars: config.chunk_overlap_chars,
        },
        Arc::clone(&metrics),
    ));

    let retrieval = RetrievalEngine::new(Arc::clone(&embedder), Arc::clone(&chunk_store));
    let synthesizer = AnswerSynthesizer::new(
        llm,
        config.chat_model.clone(),
        config.answer_context_budget_chars,
    );
    let orchestrator = ChatOrchestrator::new(
        retrieval,
        synthesizer,
        ChatLimits {
            default_top_k: config.search_default_top_k,
            max_top_k: config.search_max_top_k,
            score_threshold: config.search_default_score_threshold,
        },
    );

    let service = PaperchatService::new(
        pipeline,
        orchestrator,
        job_store,
        metrics,
        config.upload_spool_dir.clone(),
    );
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener().await.expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4300..=4399;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4300-4399",
    ))
}
