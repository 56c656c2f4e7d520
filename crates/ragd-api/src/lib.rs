//! ragd API - HTTP server
//!
//! Exposes the RAG pipeline over HTTP: ingestion, one-shot question
//! answering, a server-sent-events streaming variant, and service
//! status. OpenAPI documentation is served under `/swagger-ui`.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::status::status_handler,
        handlers::ingest::run_ingest,
        handlers::chat::ask_handler,
        handlers::chat::stream_handler,
    ),
    components(schemas(
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::status::StatusResponse,
        handlers::ingest::IngestRunResponse,
        handlers::chat::AskRequest,
        handlers::chat::AskResponseBody,
    )),
    tags(
        (name = "health", description = "Liveness probes"),
        (name = "status", description = "Pipeline and backing-service status"),
        (name = "ingest", description = "Document indexing"),
        (name = "chat", description = "Question answering"),
    )
)]
pub struct ApiDoc;
