//! ragd API Server
//!
//! Binds the real backends (Qdrant, Ollama) to the pipeline and serves
//! it over HTTP.

use std::sync::Arc;

use ragd_api::{create_router, state::AppState};
use ragd_core::config::AppConfig;
use ragd_rag::{OllamaClient, RagPipeline};
use ragd_vector::{QdrantStore, ResilientEmbedder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragd=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    let embedder = Arc::new(ResilientEmbedder::from_config(&config.embedding));
    let index = Arc::new(QdrantStore::new(&config.qdrant)?);
    let llm = Arc::new(OllamaClient::from_config(&config.llm));
    let pipeline = Arc::new(RagPipeline::new(config.clone(), embedder, index, llm));

    let state = Arc::new(AppState::new(config.clone(), pipeline));
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("ragd API server listening on http://{addr}");
    tracing::info!("Swagger UI at http://{addr}/swagger-ui/");

    axum::serve(listener, app).await?;

    Ok(())
}
