//! Service status handler
//!
//! Reports what the pipeline is actually working with right now: how
//! many points are indexed, whether the generation model is installed,
//! and whether embedding has degraded to the fallback path. Every probe
//! is tolerant; a dead backing service shows up as null/false, never as
//! an HTTP error.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Service status response
#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "ok")]
    pub status: String,

    /// Name of the Qdrant collection in use
    pub qdrant_collection: String,

    /// Number of indexed points, or null when Qdrant is unreachable or
    /// the collection does not exist yet
    pub points: Option<u64>,

    /// Configured generation model
    pub llm_model: String,

    /// Whether the configured model is installed on the LLM server
    pub model_available: bool,

    /// All models installed on the LLM server
    pub available_models: Vec<String>,

    /// Directory scanned on ingest
    pub docs_dir: String,

    /// Whether the embedding provider last took its fallback path
    pub degraded: bool,

    pub uptime_seconds: u64,
    pub total_requests: u64,
}

/// Report pipeline and backing-service status
#[utoipa::path(
    get,
    path = "/status",
    tag = "status",
    responses(
        (status = 200, description = "Current service status", body = StatusResponse)
    )
)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();

    let points = state.pipeline.indexed_points().await.ok();
    let available_models = probe_models(&state.config.llm.ollama_url).await;
    let model_available = available_models
        .iter()
        .any(|name| name == &state.config.llm.model);

    Json(StatusResponse {
        status: "ok".to_string(),
        qdrant_collection: state.config.qdrant.collection.clone(),
        points,
        llm_model: state.config.llm.model.clone(),
        model_available,
        available_models,
        docs_dir: state.config.chunking.docs_dir.display().to_string(),
        degraded: state.pipeline.is_degraded(),
        uptime_seconds: state.uptime_secs(),
        total_requests: state.total_requests(),
    })
}

/// Installed models on the LLM server; empty when the probe fails.
async fn probe_models(base_url: &str) -> Vec<String> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));

    let response = match client
        .get(&url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => response,
        _ => return Vec::new(),
    };

    let body: serde_json::Value = match response.json().await {
        Ok(body) => body,
        Err(_) => return Vec::new(),
    };

    body.get("models")
        .and_then(|models| models.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                .map(|name| name.to_string())
                .collect()
        })
        .unwrap_or_default()
}
