//! API integration tests over a fake-backed pipeline

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use tower::ServiceExt;

use ragd_api::{create_router, state::AppState};
use ragd_core::config::AppConfig;
use ragd_core::{
    Embedder, EmbeddingBatch, EmbeddingMode, GenerationBackend, GenerationOutcome,
    GenerationRequest, IndexPoint, QueryEmbedding, Result, SearchFilter, SearchHit, VectorIndex,
};
use ragd_rag::RagPipeline;

// ============================================================================
// Fakes
// ============================================================================

struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> EmbeddingBatch {
        EmbeddingBatch {
            vectors: texts.iter().map(|_| vec![0.1; 4]).collect(),
            mode: EmbeddingMode::Semantic,
        }
    }

    async fn embed_query(&self, _text: &str) -> QueryEmbedding {
        QueryEmbedding {
            vector: vec![0.1; 4],
            mode: EmbeddingMode::Semantic,
        }
    }

    fn dimension(&self) -> usize {
        4
    }

    fn is_degraded(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct MemoryIndex {
    points: Mutex<Vec<IndexPoint>>,
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, new_points: Vec<IndexPoint>) -> Result<()> {
        let mut points = self.points.lock().unwrap();
        for point in new_points {
            points.retain(|p| p.id != point.id);
            points.push(point);
        }
        Ok(())
    }

    async fn search(
        &self,
        _vector: Vec<f32>,
        top_k: usize,
        _filter: Option<SearchFilter>,
    ) -> Result<Vec<SearchHit>> {
        let points = self.points.lock().unwrap();
        Ok(points
            .iter()
            .take(top_k)
            .map(|p| SearchHit {
                id: p.id.clone(),
                score: 1.0,
                payload: p.payload.clone(),
            })
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.points.lock().unwrap().len() as u64)
    }
}

struct FakeLlm {
    answer: String,
    tokens: Vec<String>,
}

impl FakeLlm {
    fn new(answer: &str, tokens: &[&str]) -> Self {
        Self {
            answer: answer.to_string(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait]
impl GenerationBackend for FakeLlm {
    async fn ensure_model(&self, _model: &str) -> Result<()> {
        Ok(())
    }

    async fn generate(&self, _request: GenerationRequest) -> GenerationOutcome {
        GenerationOutcome::Completed(self.answer.clone())
    }

    async fn stream(&self, _request: GenerationRequest) -> BoxStream<'static, String> {
        stream::iter(self.tokens.clone()).boxed()
    }
}

// ============================================================================
// Harness
// ============================================================================

fn test_config(docs_dir: PathBuf) -> AppConfig {
    let mut config = AppConfig::default();
    config.chunking.docs_dir = docs_dir;
    // Connection refused immediately; status probes must tolerate it
    config.llm.ollama_url = "http://127.0.0.1:1".to_string();
    config
}

fn test_app_with(index: Arc<MemoryIndex>, llm: FakeLlm, docs_dir: PathBuf) -> Router {
    let config = test_config(docs_dir);
    let pipeline = Arc::new(RagPipeline::new(
        config.clone(),
        Arc::new(FakeEmbedder),
        index,
        Arc::new(llm),
    ));
    create_router(Arc::new(AppState::new(config, pipeline)))
}

fn test_app() -> Router {
    test_app_with(
        Arc::new(MemoryIndex::default()),
        FakeLlm::new("an answer", &["tok"]),
        PathBuf::from("/nonexistent"),
    )
}

async fn seeded_index(text: &str, source: &str) -> Arc<MemoryIndex> {
    let index = Arc::new(MemoryIndex::default());
    let mut payload = serde_json::Map::new();
    payload.insert("text".into(), text.into());
    payload.insert("source".into(), source.into());
    index
        .upsert(vec![IndexPoint {
            id: "f-0".to_string(),
            vector: vec![0.1; 4],
            payload,
        }])
        .await
        .unwrap();
    index
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ask_returns_answer_and_sources() {
    let index = seeded_index("passage: Vacation is 25 days.", "/docs/hr.txt").await;
    let app = test_app_with(
        index,
        FakeLlm::new("25 days per year.", &[]),
        PathBuf::from("/nonexistent"),
    );

    let response = app
        .oneshot(json_request(
            "POST",
            "/chat/ask",
            json!({"query": "How much vacation do I get?"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["answer"], "25 days per year.");
    assert_eq!(json["sources"][0], "passage: Vacation is 25 days.");
}

#[tokio::test]
async fn test_ask_blank_query_yields_empty_answer() {
    let response = test_app()
        .oneshot(json_request("POST", "/chat/ask", json!({"query": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["answer"], "");
    assert_eq!(json["sources"], json!([]));
}

#[tokio::test]
async fn test_ask_zero_top_k_is_not_an_error() {
    let index = seeded_index("passage: Vacation is 25 days.", "/docs/hr.txt").await;
    let app = test_app_with(
        index,
        FakeLlm::new("25 days per year.", &[]),
        PathBuf::from("/nonexistent"),
    );

    let response = app
        .oneshot(json_request(
            "POST",
            "/chat/ask",
            json!({"query": "vacation?", "top_k": 0}),
        ))
        .await
        .unwrap();

    // Falls back to the configured top_k instead of surfacing a
    // backend rejection
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["answer"], "25 days per year.");
    assert_eq!(json["sources"][0], "passage: Vacation is 25 days.");
}

#[tokio::test]
async fn test_ask_rejects_malformed_body() {
    let response = test_app()
        .oneshot(json_request("POST", "/chat/ask", json!({"question": "hi"})))
        .await
        .unwrap();

    // Missing required `query` field
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_ingest_run_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app_with(
        Arc::new(MemoryIndex::default()),
        FakeLlm::new("", &[]),
        dir.path().to_path_buf(),
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ingest/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["indexed"], 0);
}

#[tokio::test]
async fn test_ingest_run_indexes_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "Remote work policy.").unwrap();
    std::fs::write(dir.path().join("b.md"), "# Onboarding").unwrap();

    let index = Arc::new(MemoryIndex::default());
    let app = test_app_with(
        index.clone(),
        FakeLlm::new("", &[]),
        dir.path().to_path_buf(),
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ingest/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["indexed"], 2);
    assert_eq!(index.points.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_tolerates_dead_llm_server() {
    let index = seeded_index("passage: x", "/docs/a.txt").await;
    let app = test_app_with(index, FakeLlm::new("", &[]), PathBuf::from("/nonexistent"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["points"], 1);
    assert_eq!(json["model_available"], false);
    assert_eq!(json["available_models"], json!([]));
    assert_eq!(json["degraded"], false);
    assert_eq!(json["qdrant_collection"], "company-files");
}

#[tokio::test]
async fn test_chat_stream_emits_preamble_and_tokens() {
    let index = seeded_index("passage: Vacation is 25 days.", "/docs/hr.txt").await;
    let app = test_app_with(
        index,
        FakeLlm::new("", &["Hello", " world"]),
        PathBuf::from("/nonexistent"),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/chat/stream?q=vacation")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&body);

    assert!(text.contains("Found relevant documents for: vacation"));
    assert!(text.contains("LLM Response"));
    assert!(text.contains("Hello"));
}
