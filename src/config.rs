use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Paperchat server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores chunk embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for chunk storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Base URL of the Ollama runtime serving embeddings and completions.
    pub ollama_url: String,
    /// Embedding model identifier passed to Ollama.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Chat model used to synthesize answers.
    pub chat_model: String,
    /// Upper bound on chunk length in characters.
    pub chunk_max_chars: usize,
    /// Characters of trailing context carried into the next chunk.
    pub chunk_overlap_chars: usize,
    /// Result count applied when a chat request omits `top_k`.
    pub search_default_top_k: usize,
    /// Hard ceiling on `top_k` regardless of the request.
    pub search_max_top_k: usize,
    /// Minimum cosine similarity accepted by retrieval.
    pub search_default_score_threshold: f32,
    /// Character budget for context handed to the chat model in one pass.
    pub answer_context_budget_chars: usize,
    /// Directory where uploaded documents are spooled before ingestion.
    pub upload_spool_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_CHUNK_MAX_CHARS: usize = 2000;
const DEFAULT_CHUNK_OVERLAP_CHARS: usize = 200;
const DEFAULT_TOP_K: usize = 10;
const DEFAULT_MAX_TOP_K: usize = 50;
const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;
const DEFAULT_CONTEXT_BUDGET_CHARS: usize = 12_000;
const DEFAULT_SPOOL_DIR: &str = "spool";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", load_env("EMBEDDING_DIMENSION")?)?,
            chat_model: load_env("CHAT_MODEL")?,
            chunk_max_chars: parse_env_or("CHUNK_MAX_CHARS", DEFAULT_CHUNK_MAX_CHARS)?,
            chunk_overlap_chars: parse_env_or("CHUNK_OVERLAP_CHARS", DEFAULT_CHUNK_OVERLAP_CHARS)?,
            search_default_top_k: parse_env_or("SEARCH_DEFAULT_TOP_K", DEFAULT_TOP_K)?,
            search_max_top_k: parse_env_or("SEARCH_MAX_TOP_K", DEFAULT_MAX_TOP_K)?,
            search_default_score_threshold: parse_env_or(
                "SEARCH_DEFAULT_SCORE_THRESHOLD",
                DEFAULT_SCORE_THRESHOLD,
            )?,
            answer_context_budget_chars: parse_env_or(
                "ANSWER_CONTEXT_BUDGET_CHARS",
                DEFAULT_CONTEXT_BUDGET_CHARS,
            )?,
            upload_spool_dir: load_env_optional("UPLOAD_SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPOOL_DIR)),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };

        if config.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if config.chunk_max_chars == 0 || config.chunk_overlap_chars >= config.chunk_max_chars {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP_CHARS".into()));
        }

        Ok(config)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: String) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(raw) => parse_env(key, raw),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        ollama_url = %config.ollama_url,
        embedding_model = %config.embedding_model,
        chat_model = %config.chat_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
