//! Test error types.

use thiserror::Error;

/// Errors that can occur during testing.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// Response body is not UTF-8.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body is not an envelope.
    #[error("Not an envelope: {0}")]
    NotEnvelope(String),
}
