//! Error types for the outbound client.

use thiserror::Error;

/// Errors raised while calling a remote service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client was built without any host.
    #[error("no hosts configured")]
    NoHosts,

    /// The HTTP client could not be constructed.
    #[error("failed to create client: {message}")]
    Build {
        /// Error message.
        message: String,
    },

    /// Every configured host failed.
    #[error("all {attempted} hosts failed, last error: {last}")]
    Unavailable {
        /// Number of hosts tried.
        attempted: usize,
        /// Error reported by the last host.
        last: String,
    },

    /// The reply was not a JSON object.
    #[error("malformed reply: {message}")]
    Malformed {
        /// Error message.
        message: String,
    },

    /// The remote service answered with an error envelope.
    #[error("remote call failed: {message}")]
    Remote {
        /// Error codes from the envelope.
        codes: Vec<String>,
        /// Messages joined with `", "`.
        message: String,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Creates a malformed reply error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying against the same hosts may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ClientError::Unavailable {
            attempted: 2,
            last: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "all 2 hosts failed, last error: connection refused");
        assert!(err.is_transient());
        assert!(!ClientError::NoHosts.is_transient());
    }
}
