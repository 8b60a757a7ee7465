//! Core error types for Confab.

use thiserror::Error;

/// Core error type for Confab operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration or settings value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data from a response or a store.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A collaborator store failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
