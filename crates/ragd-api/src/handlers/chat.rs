//! Question answering handlers

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::state::AppState;

/// Ask request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct AskRequest {
    /// User's question
    #[schema(example = "How many vacation days do I get?")]
    pub query: String,

    /// Override the configured number of retrieved passages
    #[serde(default)]
    #[schema(example = 5)]
    pub top_k: Option<usize>,
}

/// Ask response body
#[derive(Debug, Serialize, ToSchema)]
pub struct AskResponseBody {
    /// Generated answer. Timeouts and generation failures surface as
    /// diagnostic text here, never as an HTTP error.
    pub answer: String,

    /// Context strings the answer was grounded on, in retrieval order
    pub sources: Vec<String>,
}

/// Answer a question in one shot
#[utoipa::path(
    post,
    path = "/chat/ask",
    tag = "chat",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer generated", body = AskResponseBody),
        (status = 500, description = "Retrieval failed", body = crate::error::ApiError)
    )
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponseBody>, AppError> {
    state.increment_requests();

    let response = state.pipeline.ask(&req.query, req.top_k).await?;

    Ok(Json(AskResponseBody {
        answer: response.answer,
        sources: response.sources,
    }))
}

/// Stream query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct StreamParams {
    /// User's question
    pub q: String,
}

/// Answer a question as a server-sent event stream: retrieval preamble
/// first, then the model's tokens.
#[utoipa::path(
    get,
    path = "/chat/stream",
    tag = "chat",
    params(StreamParams),
    responses(
        (status = 200, description = "Event stream started"),
        (status = 500, description = "Retrieval failed", body = crate::error::ApiError)
    )
)]
pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state.increment_requests();

    let events = state.pipeline.ask_stream(&params.q).await?;
    let stream = events.map(|chunk| Ok(Event::default().data(chunk)));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
