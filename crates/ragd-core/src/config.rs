//! ragd Configuration Management
//!
//! Handles configuration from environment variables and TOML config
//! files with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Qdrant connection
    pub qdrant: QdrantConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// LLM backend configuration
    pub llm: LlmConfig,

    /// Document chunking configuration
    pub chunking: ChunkingConfig,

    /// Retrieval configuration
    pub rag: RagConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("RAGD_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("RAGD_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAGD_PORT".to_string(),
                value: port,
            })?;
        }

        // Qdrant
        if let Ok(url) = std::env::var("RAGD_QDRANT_URL") {
            config.qdrant.url = url;
        }
        if let Ok(name) = std::env::var("RAGD_QDRANT_COLLECTION") {
            config.qdrant.collection = name;
        }
        if let Ok(v) = std::env::var("RAGD_RECREATE_COLLECTION") {
            config.qdrant.recreate_collection = matches!(v.as_str(), "1" | "true" | "yes");
        }

        // Embedding
        if let Ok(url) = std::env::var("RAGD_EMBEDDING_URL") {
            config.embedding.ollama_url = url;
        }
        if let Ok(model) = std::env::var("RAGD_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        // LLM
        if let Ok(url) = std::env::var("RAGD_LLM_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("RAGD_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(t) = std::env::var("RAGD_LLM_TEMPERATURE") {
            config.llm.temperature = t.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAGD_LLM_TEMPERATURE".to_string(),
                value: t,
            })?;
        }

        // Chunking
        if let Ok(dir) = std::env::var("RAGD_DOCS_DIR") {
            config.chunking.docs_dir = PathBuf::from(dir);
        }
        if let Ok(size) = std::env::var("RAGD_CHUNK_SIZE") {
            config.chunking.chunk_size = size.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAGD_CHUNK_SIZE".to_string(),
                value: size,
            })?;
        }
        if let Ok(overlap) = std::env::var("RAGD_CHUNK_OVERLAP") {
            config.chunking.chunk_overlap =
                overlap.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "RAGD_CHUNK_OVERLAP".to_string(),
                    value: overlap,
                })?;
        }

        // Retrieval
        if let Ok(k) = std::env::var("RAGD_TOP_K") {
            config.rag.top_k = k.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAGD_TOP_K".to_string(),
                value: k,
            })?;
        }
        if let Ok(prompt) = std::env::var("RAGD_SYSTEM_PROMPT") {
            config.rag.system_prompt = prompt;
        }

        // Logging
        if let Ok(level) = std::env::var("RAGD_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        if env_config.server.host != defaults.server.host {
            self.server.host = env_config.server.host;
        }
        if env_config.server.port != defaults.server.port {
            self.server.port = env_config.server.port;
        }
        if env_config.qdrant.url != defaults.qdrant.url {
            self.qdrant.url = env_config.qdrant.url;
        }
        if env_config.llm.ollama_url != defaults.llm.ollama_url {
            self.llm.ollama_url = env_config.llm.ollama_url;
        }
        if env_config.llm.model != defaults.llm.model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.chunking.docs_dir != defaults.chunking.docs_dir {
            self.chunking.docs_dir = env_config.chunking.docs_dir;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_overlap".to_string(),
                value: format!(
                    "{} (must be less than chunk_size {})",
                    self.chunking.chunk_overlap, self.chunking.chunk_size
                ),
            });
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rag.top_k".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Qdrant connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Qdrant gRPC URL
    pub url: String,

    /// Collection name
    pub collection: String,

    /// Drop and recreate the collection on next ensure. Destroys all
    /// indexed data.
    pub recreate_collection: bool,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://qdrant:6334".to_string(),
            collection: "company-files".to_string(),
            recreate_collection: false,
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama server URL for the embedding API
    pub ollama_url: String,

    /// Embedding model name
    pub model: String,

    /// Vector length used by the random fallback provider when no
    /// embedding model is configured
    pub fallback_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://ollama:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            fallback_dimension: 384,
        }
    }
}

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama server URL
    pub ollama_url: String,

    /// Model tag to generate with
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens per answer (num_predict)
    pub max_tokens: u32,

    /// Context window size. Kept small for latency rather than
    /// completeness.
    pub num_ctx: u32,

    /// Total timeout for a one-shot generation, seconds
    pub timeout_secs: u64,

    /// Total timeout for a streaming generation, seconds
    pub stream_timeout_secs: u64,

    /// Timeout for the installed-models probe, seconds
    pub tags_timeout_secs: u64,

    /// Timeout for pulling a missing model, seconds. Minutes-scale on
    /// purpose: pulls download gigabytes.
    pub pull_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://ollama:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            temperature: 0.2,
            max_tokens: 200,
            num_ctx: 2048,
            timeout_secs: 30,
            stream_timeout_secs: 15,
            tags_timeout_secs: 30,
            pull_timeout_secs: 600,
        }
    }
}

/// Document chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Root directory scanned for documents
    pub docs_dir: PathBuf,

    /// Window length in characters
    pub chunk_size: usize,

    /// Overlap between consecutive windows, must be < chunk_size
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("/data/docs"),
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Number of nearest neighbors retrieved per query
    pub top_k: usize,

    /// System instruction prepended to every prompt
    pub system_prompt: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            system_prompt: "You are a helpful assistant answering employee questions \
                            from internal documents.\nUse only the provided context. \
                            If unsure, say you cannot find the answer in the available \
                            resources."
                .to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
