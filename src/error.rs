//! Error types for the Noteguard service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Fatal, startup-level errors.
///
/// Anything here halts the process; there is no partial degraded mode.
#[derive(Error, Debug)]
pub enum NoteguardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Noteguard operations.
pub type Result<T> = std::result::Result<T, NoteguardError>;

/// Request-level errors surfaced to API clients by the notes handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The path parameter is not a valid ObjectId
    #[error("invalid note id")]
    InvalidId,

    /// The request body is missing required fields
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// No note exists under the given id
    #[error("note not found")]
    NotFound,

    /// Document store failure
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidId => (StatusCode::BAD_REQUEST, "Invalid ID format"),
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Note not found"),
            ApiError::Database(e) => {
                // Log the detail server-side, never echo it to the client.
                error!(error = %e, "database operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
