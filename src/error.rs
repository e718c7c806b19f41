//! Error types for the document processing service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
///
/// The worker's retry loop distinguishes `CircuitOpen` from `Extraction`:
/// both consume a retry attempt, but only real extraction failures are
/// recorded against the circuit breaker.
#[derive(Debug, Error)]
pub enum Error {
    /// Document (or job) does not exist
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// Upload rejected before a document was created
    #[error("{0}")]
    Validation(String),

    /// Request is valid but the document is in the wrong state for it
    #[error("{0}")]
    Conflict(String),

    /// Text extraction backend failed
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The circuit breaker rejected the call before reaching the backend
    #[error("text extraction circuit breaker is open")]
    CircuitOpen,

    /// Database failure
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration problem
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Status code this error maps to on the HTTP surface
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
