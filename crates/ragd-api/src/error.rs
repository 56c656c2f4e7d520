//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use ragd_core::RagdError;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
    Backend(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
            AppError::Backend(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("BACKEND_ERROR", "A backing service failed").with_details(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<RagdError> for AppError {
    fn from(err: RagdError) -> Self {
        match err {
            RagdError::ConfigError(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            RagdError::VectorBackend(msg)
            | RagdError::CollectionMissing(msg)
            | RagdError::SearchError(msg)
            | RagdError::Embedding(msg)
            | RagdError::LlmError(msg) => AppError::Backend(msg),
            RagdError::Extraction { path, reason } => {
                AppError::Internal(format!("Extraction failed for {path}: {reason}"))
            }
            RagdError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
