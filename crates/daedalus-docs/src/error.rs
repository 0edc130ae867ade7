//! Error types for the documentation crate.
//!
//! This module defines errors that can occur while describing a service
//! and serializing its definition.

use daedalus_core::RpcError;
use thiserror::Error;

/// Errors that can occur during definition generation.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the definition to JSON.
    #[error("Failed to serialize service definition: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The contract of a method could not be extracted.
    #[error("Failed to extract contract of '{method}': {source}")]
    Contract {
        /// Action id of the method.
        method: String,
        /// The extraction error.
        #[source]
        source: RpcError,
    },

    /// An attached action cannot be described.
    #[error("Invalid operation '{operation_id}': {reason}")]
    InvalidOperation {
        /// The action id that is invalid.
        operation_id: String,
        /// The reason the operation is invalid.
        reason: String,
    },
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;
