//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent malformed registry data.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: String, key: String },

    #[error("invalid record #{position} in {collection}: {message}")]
    InvalidRecord {
        collection: String,
        position: usize,
        message: String,
    },

    #[error("invalid {collection} document: {message}")]
    InvalidDocument { collection: String, message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
