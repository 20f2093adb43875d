//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache library and its admin API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A call argument could not be rendered deterministically
    #[error("Unserializable argument: {0}")]
    UnserializableArgument(String),

    /// The same named argument was supplied twice
    #[error("Duplicate named argument: {0}")]
    DuplicateArgument(String),

    /// The storage backend could not be reached
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A value could not be encoded for storage
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for failures of the storage backend itself.
    pub fn is_backend(&self) -> bool {
        matches!(self, CacheError::BackendUnavailable(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::UnserializableArgument(_)
            | CacheError::DuplicateArgument(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Serialization(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
