//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage authentication failed: {0}")]
    Auth(String),
    #[error("Upstream unavailable: {0}")]
    Transport(String),
    #[error("Processing failed: {0}")]
    Semantic(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None)
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Auth(detail) => {
                tracing::warn!(detail, "Storage authentication failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "STORAGE_AUTH_FAILED",
                    "Storage provider rejected the service credentials".to_string(),
                    Some(detail),
                )
            }
            ApiError::Transport(detail) => {
                tracing::warn!(detail, "Upstream unavailable");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "UPSTREAM_UNAVAILABLE",
                    "An upstream service did not respond".to_string(),
                    Some(detail),
                )
            }
            ApiError::Semantic(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PROCESSING_FAILED",
                "The document could not be processed".to_string(),
                Some(detail),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Auth(detail) => ApiError::Auth(detail),
            PipelineError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            PipelineError::Transport(detail) => ApiError::Transport(detail),
            PipelineError::Semantic(detail) => ApiError::Semantic(detail),
            PipelineError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
