//! ragd Vector - Embedding providers and the vector index
//!
//! The embedding side maps text to fixed-dimension vectors, degrading
//! to a non-semantic random fallback when the model backend is down.
//! The index side owns a named Qdrant collection with cosine distance.

pub mod embedding;
pub mod qdrant_store;

pub use embedding::{EmbeddingClient, FallbackEmbedding, OllamaEmbedding, ResilientEmbedder};
pub use qdrant_store::QdrantStore;
