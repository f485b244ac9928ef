//! Shared error taxonomy.
//!
//! Every layer of the crate returns [`VaultError`]. The variants mirror the
//! failure classes a caller can actually act on: bad input, an unreachable
//! or misbehaving embedding backend, a vector that does not fit the store's
//! schema, a missing resource, and the store itself failing. Each variant
//! renders a short human-readable message, so the orchestration layer can
//! hand `err.to_string()` straight to its caller.

use thiserror::Error;

/// Unified error type for ingestion, retrieval, and storage operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    /// Input rejected before any side effect (empty content, zero `k`, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The embedding backend was unreachable, returned a malformed payload,
    /// or returned the wrong number of vectors for the batch.
    #[error("embedding backend error: {0}")]
    EmbeddingBackend(String),

    /// A vector's dimension does not match the deployment dimension `D`.
    #[error("schema violation: expected a {expected}-dimensional vector, got {actual}")]
    SchemaViolation { expected: usize, actual: usize },

    /// The referenced resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The underlying store failed or returned corrupt data.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for VaultError {
    fn from(err: reqwest::Error) -> Self {
        VaultError::EmbeddingBackend(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for VaultError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = VaultError::SchemaViolation {
            expected: 1536,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "schema violation: expected a 1536-dimensional vector, got 3"
        );

        let err = VaultError::Validation("content must not be empty".into());
        assert!(err.to_string().starts_with("validation failed"));
    }
}
