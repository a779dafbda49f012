use serde::Deserialize;
use std::env;
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

/// Runtime configuration for the Arke server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding model identifier; storage and query embeddings must share it.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors, fixed at collection creation.
    pub embedding_dimension: usize,
    /// Directory holding the content-addressed embedding cache.
    pub embedding_cache_dir: String,
    /// Splitter kind applied during ingestion (`recursive` or `token`).
    ///
    /// Kept as a raw string so that an unsupported value surfaces as a
    /// configuration error at split time rather than at startup.
    pub splitter_kind: String,
    /// Chunk size in splitter units (characters or tokens).
    pub chunk_size: usize,
    /// Overlap repeated at each chunk boundary, in splitter units.
    pub chunk_overlap: usize,
    /// OCR language hint forwarded to the extraction backend.
    pub ocr_language: String,
    /// Model identifier used for grounded answer generation.
    pub generation_model: String,
    /// Optional API key for the OpenAI-compatible generation endpoint.
    pub openai_api_key: Option<String>,
    /// Optional override for the OpenAI-compatible base URL.
    pub openai_base_url: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            embedding_cache_dir: load_env_optional("EMBEDDING_CACHE_DIR")
                .unwrap_or_else(|| "./cache".to_string()),
            splitter_kind: load_env_optional("SPLITTER_KIND")
                .unwrap_or_else(|| "recursive".to_string()),
            chunk_size: parse_optional("CHUNK_SIZE")?.unwrap_or(800),
            chunk_overlap: parse_optional("CHUNK_OVERLAP")?.unwrap_or(100),
            ocr_language: load_env_optional("OCR_LANGUAGE").unwrap_or_else(|| "eng".to_string()),
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL"),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
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
        embedding_model = %config.embedding_model,
        splitter = %config.splitter_kind,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
