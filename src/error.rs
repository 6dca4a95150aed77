//! Error types for the collection API
//!
//! Provides unified error handling using thiserror. Only `ApiError` ever
//! reaches a client; store and serialization failures are absorbed by the
//! cache layer.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Body sent for every authentication rejection.
pub const UNAUTHENTICATED_MESSAGE: &str = "Invalid credentials. Please log in again.";

// == API Error Enum ==
/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Any authentication guard rejection. The cause is never exposed.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Requested record absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => {
                let body = Json(json!({ "error": UNAUTHENTICATED_MESSAGE }));
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    body,
                )
                    .into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Store Error ==
/// Failure talking to the key-value store. Treated as "store unavailable".
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store command failed: {0}")]
    Command(String),

    #[error("store operation timed out after {0} ms")]
    Timeout(u64),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() || err.is_connection_dropped() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

// == Serialization Error ==
/// A result could not be converted to or from the cache wire format.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("field `{field}` holds a value of type {kind} that has no JSON form")]
    Unrepresentable { field: String, kind: &'static str },

    #[error("decimal in field `{0}` does not fit a float")]
    DecimalOverflow(String),

    #[error("malformed cache payload: {0}")]
    Json(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
