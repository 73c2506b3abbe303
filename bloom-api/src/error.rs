//! Error types for bloom-api
//!
//! Every failure path returns a structured JSON payload of the form
//! `{"error": <message>}`; stack traces never leak to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid identity where identity is required (401).
    /// Checked before any external side effect.
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing or malformed request field (400). Checked before any
    /// external call.
    #[error("{0}")]
    Validation(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// External provider (payment, assistant) failure (502). The
    /// provider's message is surfaced verbatim and the call is never
    /// auto-retried.
    #[error("{0}")]
    Provider(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// bloom-common error
    #[error("{0}")]
    Common(#[from] bloom_common::Error),
}

impl From<crate::tracker::TrackerError> for ApiError {
    fn from(e: crate::tracker::TrackerError) -> ApiError {
        use crate::tracker::TrackerError;
        match e {
            TrackerError::NotFound(id) => ApiError::NotFound(format!("Record not found: {}", id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Provider(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Common(ref err) => {
                tracing::error!(error = %err, "Store failure in request handler");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
