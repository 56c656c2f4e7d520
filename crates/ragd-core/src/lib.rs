//! ragd Core - Shared types, traits, and configuration
//!
//! This crate defines the abstractions the pipeline crates plug into:
//! - Error taxonomy for ingestion, retrieval, and generation
//! - Chunk and search-result data model
//! - Seam traits for the embedding provider, vector index, and
//!   generation backend
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConfigError};

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Role prefixes and sentinel strings
// ============================================================================

/// Prefix applied to indexed document text. E5-family embedding models
/// are asymmetric between document and query encodings; the prefix is a
/// fixed literal, not metadata.
pub const PASSAGE_PREFIX: &str = "passage: ";

/// Prefix applied to user queries before embedding.
pub const QUERY_PREFIX: &str = "query: ";

/// Answer substituted when generation exceeds its timeout. A timeout is
/// a capacity signal and retry-worthy, so it gets its own message.
pub const OVERLOAD_SENTINEL: &str =
    "Response timed out. The model may be overloaded. Please try again.";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ragd operations
#[derive(Error, Debug)]
pub enum RagdError {
    /// A file could not be read or parsed during ingestion. Local and
    /// non-fatal: the file contributes zero chunks and the run continues.
    #[error("Extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The collection does not exist. Normal, non-exceptional: callers
    /// respond by creating it.
    #[error("Collection not found: {0}")]
    CollectionMissing(String),

    /// The vector backend could not be reached or rejected the call.
    /// Fatal for the current operation.
    #[error("Vector backend error: {0}")]
    VectorBackend(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RagdError>;

// ============================================================================
// Chunk Model
// ============================================================================

/// Provenance for a chunk: which file it came from and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Normalized path of the source file
    pub source: String,

    /// Zero-based position of this chunk within the source
    pub chunk_index: u32,
}

/// A bounded slice of a document's text, the unit of indexing.
///
/// `id` is derived deterministically from the source path and chunk
/// index, so re-ingesting the same file with the same chunking
/// parameters reproduces identical ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,

    /// Chunk text with [`PASSAGE_PREFIX`] already applied
    pub text: String,

    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Payload stored alongside the vector in the index. Includes the
    /// prefixed text so retrieval can return it as context directly.
    pub fn payload(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("source".into(), self.metadata.source.clone().into());
        payload.insert("chunk".into(), self.metadata.chunk_index.into());
        payload.insert("text".into(), self.text.clone().into());
        payload
    }
}

// ============================================================================
// Retrieval Types
// ============================================================================

/// One entry to upsert into the vector index.
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// A ranked similarity-search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,

    /// Similarity score, higher is better
    pub score: f32,

    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl SearchHit {
    /// Stored passage text, if the payload carries one.
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(|v| v.as_str())
    }

    /// Source path, if the payload carries one.
    pub fn source(&self) -> Option<&str> {
        self.payload.get("source").and_then(|v| v.as_str())
    }
}

/// Payload equality filter for similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilter {
    pub field: String,
    pub value: String,
}

// ============================================================================
// Pipeline Responses
// ============================================================================

/// Outcome of an ingest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Number of chunks indexed. Zero is a valid, non-error outcome.
    pub indexed: usize,
}

/// Answer plus the contexts it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,

    /// Context strings handed to the model, in retrieval order
    pub sources: Vec<String>,
}

// ============================================================================
// Embedding Provider
// ============================================================================

/// Which path produced a set of vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Model-backed vectors from the embedding service
    Semantic,
    /// Uniform random vectors; retrieval quality is degraded
    Fallback,
}

/// A batch of document embeddings, tagged with the path that produced
/// them so callers can observe degraded operation instead of inferring
/// it from output shape.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    pub vectors: Vec<Vec<f32>>,
    pub mode: EmbeddingMode,
}

/// A single query embedding, mode-tagged like [`EmbeddingBatch`].
#[derive(Debug, Clone)]
pub struct QueryEmbedding {
    pub vector: Vec<f32>,
    pub mode: EmbeddingMode,
}

/// Maps text to fixed-dimension vectors. Implementations must never
/// fail: when the model backend is unavailable they degrade to a
/// non-semantic fallback and tag the result accordingly.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts
    async fn embed(&self, texts: &[String]) -> EmbeddingBatch;

    /// Embed a single query text
    async fn embed_query(&self, text: &str) -> QueryEmbedding;

    /// Vector length. Fixed for the provider's lifetime; queryable
    /// before the index creates its collection.
    fn dimension(&self) -> usize;

    /// Whether the most recent call took the fallback path
    fn is_degraded(&self) -> bool;
}

// ============================================================================
// Vector Index
// ============================================================================

/// A named, dimension-fixed collection of vector entries supporting
/// upsert and k-nearest-neighbor search.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if absent; delete and recreate it when the
    /// recreate directive is set. Idempotent otherwise.
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Upsert a batch, last-write-wins per id. The batch surfaces a
    /// single error on failure; partial application inside the backend
    /// is backend-dependent, not exactly-once.
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Return up to `top_k` nearest entries by descending similarity.
    /// Fewer entries than `top_k` is not an error.
    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<SearchHit>>;

    /// Number of entries currently stored
    async fn count(&self) -> Result<u64>;
}

// ============================================================================
// Generation Backend
// ============================================================================

/// Parameters for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Explicit result of a generation call. Timeouts and transport errors
/// are values, not exceptions, so callers and tests can assert on which
/// path was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed(String),
    TimedOut,
    Failed(String),
}

impl GenerationOutcome {
    /// Render the outcome as a user-facing answer string. Failures are
    /// diagnostic text in the answer field, never an empty response.
    pub fn into_answer(self) -> String {
        match self {
            Self::Completed(answer) => answer,
            Self::TimedOut => OVERLOAD_SENTINEL.to_string(),
            Self::Failed(cause) => format!("Error generating response: {cause}"),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Talks to a text-generation backend.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Make sure `model` is installed, pulling it if absent. Idempotent
    /// and safe to call before every generation request.
    async fn ensure_model(&self, model: &str) -> Result<()>;

    /// One-shot generation under a hard timeout
    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome;

    /// Incremental generation. The stream is lazy, finite, and
    /// non-restartable; on timeout or error it yields one final
    /// diagnostic string instead of raising, so a mid-render consumer
    /// always receives a terminal, renderable event.
    async fn stream(&self, request: GenerationRequest) -> BoxStream<'static, String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_payload_fields() {
        let chunk = Chunk {
            id: "abc-0".to_string(),
            text: format!("{PASSAGE_PREFIX}hello world"),
            metadata: ChunkMetadata {
                source: "/docs/a.txt".to_string(),
                chunk_index: 0,
            },
        };

        let payload = chunk.payload();
        assert_eq!(payload["source"], "/docs/a.txt");
        assert_eq!(payload["chunk"], 0);
        assert_eq!(payload["text"], "passage: hello world");
    }

    #[test]
    fn test_search_hit_accessors() {
        let mut payload = serde_json::Map::new();
        payload.insert("text".into(), "passage: body".into());
        payload.insert("source".into(), "/docs/a.txt".into());

        let hit = SearchHit {
            id: "abc-0".to_string(),
            score: 0.9,
            payload,
        };

        assert_eq!(hit.text(), Some("passage: body"));
        assert_eq!(hit.source(), Some("/docs/a.txt"));
    }

    #[test]
    fn test_outcome_into_answer() {
        assert_eq!(
            GenerationOutcome::Completed("fine".into()).into_answer(),
            "fine"
        );
        assert_eq!(GenerationOutcome::TimedOut.into_answer(), OVERLOAD_SENTINEL);
        assert_eq!(
            GenerationOutcome::Failed("boom".into()).into_answer(),
            "Error generating response: boom"
        );
    }

    #[test]
    fn test_outcome_is_completed() {
        assert!(GenerationOutcome::Completed(String::new()).is_completed());
        assert!(!GenerationOutcome::TimedOut.is_completed());
        assert!(!GenerationOutcome::Failed("x".into()).is_completed());
    }
}
