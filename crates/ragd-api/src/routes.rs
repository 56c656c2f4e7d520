//! API route definitions

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{chat, health, ingest, status};
use crate::state::AppState;
use crate::ApiDoc;

/// Assemble the full application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/status", get(status::status_handler))
        .route("/ingest/run", post(ingest::run_ingest))
        .route("/chat/ask", post(chat::ask_handler))
        .route("/chat/stream", get(chat::stream_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
