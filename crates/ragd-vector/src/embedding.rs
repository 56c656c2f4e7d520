//! Embedding providers
//!
//! Two variants sit behind the [`Embedder`] seam: a model-backed
//! client for the Ollama embedding API, and a random-vector fallback
//! used when the model backend cannot be reached. The resilient
//! wrapper degrades to the fallback instead of failing, and tags every
//! batch with the path that produced it.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use ragd_core::config::EmbeddingConfig;
use ragd_core::{
    Embedder, EmbeddingBatch, EmbeddingMode, QueryEmbedding, RagdError, Result,
};

// ============================================================================
// Embedding client trait
// ============================================================================

/// A backend that can turn text into vectors, fallibly. The resilient
/// wrapper turns failures into degraded-mode batches.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embeddings for a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

// ============================================================================
// Ollama embedding client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = match model.as_str() {
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            _ => 768, // Default for most models
        };

        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.ollama_url.clone(), config.model.clone())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| RagdError::Embedding(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagdError::Embedding(format!(
                "Embedding backend error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            RagdError::Embedding(format!("Failed to parse embedding response: {e}"))
        })?;

        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama has no native batch embedding, so process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed_one(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Fallback provider
// ============================================================================

/// Produces uniformly random vectors at a fixed dimension. Not
/// semantic; exists so ingestion and query keep working while the
/// model backend is down.
pub struct FallbackEmbedding {
    dimension: usize,
}

impl FallbackEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn vector(&self) -> Vec<f32> {
        let mut rng = rand::thread_rng();
        (0..self.dimension).map(|_| rng.gen::<f32>()).collect()
    }

    pub fn vectors(&self, count: usize) -> Vec<Vec<f32>> {
        (0..count).map(|_| self.vector()).collect()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Resilient embedder
// ============================================================================

/// [`Embedder`] implementation that prefers the model-backed client
/// and degrades to random vectors when it fails. Degradation is
/// observable: the batch is tagged [`EmbeddingMode::Fallback`], a warn
/// is logged, and [`Embedder::is_degraded`] reflects the most recent
/// call.
pub struct ResilientEmbedder {
    client: Option<Box<dyn EmbeddingClient>>,
    fallback: FallbackEmbedding,
    degraded: AtomicBool,
}

impl ResilientEmbedder {
    /// Wrap a model-backed client. The fallback generates vectors at
    /// the client's dimension so every vector fits the same collection.
    pub fn new(client: Box<dyn EmbeddingClient>) -> Self {
        let dimension = client.dimension();
        Self {
            client: Some(client),
            fallback: FallbackEmbedding::new(dimension),
            degraded: AtomicBool::new(false),
        }
    }

    /// No model backend at all; every call takes the fallback path.
    pub fn fallback_only(dimension: usize) -> Self {
        Self {
            client: None,
            fallback: FallbackEmbedding::new(dimension),
            degraded: AtomicBool::new(true),
        }
    }

    /// Build from config. An empty model name disables the model
    /// backend entirely; everything then runs fallback-only at the
    /// configured fallback dimension.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        if config.model.is_empty() {
            return Self::fallback_only(config.fallback_dimension);
        }
        Self::new(Box::new(OllamaEmbedding::from_config(config)))
    }

    async fn try_client(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        let client = self.client.as_ref()?;
        match client.embed_batch(texts).await {
            Ok(vectors) => Some(vectors),
            Err(e) => {
                tracing::warn!("embedding backend failed, using random fallback: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Embedder for ResilientEmbedder {
    async fn embed(&self, texts: &[String]) -> EmbeddingBatch {
        if texts.is_empty() {
            return EmbeddingBatch {
                vectors: Vec::new(),
                mode: EmbeddingMode::Semantic,
            };
        }

        match self.try_client(texts).await {
            Some(vectors) => {
                self.degraded.store(false, Ordering::SeqCst);
                EmbeddingBatch {
                    vectors,
                    mode: EmbeddingMode::Semantic,
                }
            }
            None => {
                self.degraded.store(true, Ordering::SeqCst);
                EmbeddingBatch {
                    vectors: self.fallback.vectors(texts.len()),
                    mode: EmbeddingMode::Fallback,
                }
            }
        }
    }

    async fn embed_query(&self, text: &str) -> QueryEmbedding {
        let batch = self.embed(&[text.to_string()]).await;
        let mode = batch.mode;
        let vector = batch
            .vectors
            .into_iter()
            .next()
            .unwrap_or_else(|| self.fallback.vector());
        QueryEmbedding { vector, mode }
    }

    fn dimension(&self) -> usize {
        self.fallback.dimension()
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingClient;

    #[async_trait]
    impl EmbeddingClient for FailingClient {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(RagdError::Embedding("model not loaded".to_string()))
        }

        fn dimension(&self) -> usize {
            384
        }
    }

    struct ConstantClient;

    #[async_trait]
    impl EmbeddingClient for ConstantClient {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_ollama_dimension_table() {
        let client = OllamaEmbedding::new("http://localhost:11434", "nomic-embed-text");
        assert_eq!(client.dimension(), 768);

        let client = OllamaEmbedding::new("http://localhost:11434", "mxbai-embed-large");
        assert_eq!(client.dimension(), 1024);

        let client = OllamaEmbedding::new("http://localhost:11434", "all-minilm");
        assert_eq!(client.dimension(), 384);
    }

    #[test]
    fn test_fallback_vector_shape() {
        let fallback = FallbackEmbedding::new(384);
        let vectors = fallback.vectors(3);

        assert_eq!(vectors.len(), 3);
        for v in &vectors {
            assert_eq!(v.len(), 384);
            assert!(v.iter().all(|x| (0.0..1.0).contains(x)));
        }
    }

    #[tokio::test]
    async fn test_failing_client_degrades_to_fallback() {
        let embedder = ResilientEmbedder::new(Box::new(FailingClient));
        let texts = vec!["one".to_string(), "two".to_string()];

        let batch = embedder.embed(&texts).await;
        assert_eq!(batch.mode, EmbeddingMode::Fallback);
        assert_eq!(batch.vectors.len(), 2);
        assert!(batch.vectors.iter().all(|v| v.len() == 384));
        assert!(embedder.is_degraded());

        let query = embedder.embed_query("query: hello").await;
        assert_eq!(query.mode, EmbeddingMode::Fallback);
        assert_eq!(query.vector.len(), 384);
    }

    #[tokio::test]
    async fn test_healthy_client_stays_semantic() {
        let embedder = ResilientEmbedder::new(Box::new(ConstantClient));

        let batch = embedder.embed(&["a".to_string()]).await;
        assert_eq!(batch.mode, EmbeddingMode::Semantic);
        assert_eq!(batch.vectors, vec![vec![0.5; 4]]);
        assert!(!embedder.is_degraded());
        assert_eq!(embedder.dimension(), 4);
    }

    #[tokio::test]
    async fn test_fallback_only_is_degraded_from_the_start() {
        let embedder = ResilientEmbedder::fallback_only(384);
        assert!(embedder.is_degraded());
        assert_eq!(embedder.dimension(), 384);

        let batch = embedder.embed(&["text".to_string()]).await;
        assert_eq!(batch.mode, EmbeddingMode::Fallback);
        assert_eq!(batch.vectors[0].len(), 384);
    }

    #[tokio::test]
    async fn test_from_config_empty_model_is_fallback_only() {
        let config = EmbeddingConfig {
            model: String::new(),
            ..EmbeddingConfig::default()
        };

        let embedder = ResilientEmbedder::from_config(&config);
        assert!(embedder.is_degraded());
        assert_eq!(embedder.dimension(), 384);

        let batch = embedder.embed(&["text".to_string()]).await;
        assert_eq!(batch.mode, EmbeddingMode::Fallback);
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty() {
        let embedder = ResilientEmbedder::new(Box::new(ConstantClient));
        let batch = embedder.embed(&[]).await;
        assert!(batch.vectors.is_empty());
    }
}
