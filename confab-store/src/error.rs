//! Store error types.

use confab_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// System keychain error.
    #[error("Keychain error: {0}")]
    Keychain(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A named document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Returns true if the error means the file is simply absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            StoreError::NotFound(_) => true,
            _ => false,
        }
    }
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        StoreError::Keychain(err.to_string())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => CoreError::Serialization(e),
            StoreError::Config(msg) => CoreError::InvalidConfig(msg),
            other => CoreError::Storage(other.to_string()),
        }
    }
}
