//! Session error types.

use confab_core::{CoreError, Message};
use confab_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by a chat send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// No valid token could be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection, timeout, or stream failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The API rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// The caller cancelled the send.
    #[error("Request cancelled")]
    Cancelled,

    /// The API answered without any content.
    #[error("No response received")]
    EmptyResponse,

    /// Invalid settings or input.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<TransportError> for ChatError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Api { status, message } => ChatError::Api { status, message },
            TransportError::Auth(msg) => ChatError::Auth(msg),
            TransportError::Config(msg) => ChatError::Config(msg),
            TransportError::Network(_) | TransportError::Decode(_) => {
                ChatError::Network(err.to_string())
            }
        }
    }
}

impl From<CoreError> for ChatError {
    fn from(err: CoreError) -> Self {
        ChatError::Config(err.to_string())
    }
}

/// A failed send.
///
/// Carries the user message, marked as failed, so the caller can show it or
/// resend it.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct SendFailure {
    /// The user message with status `Error`.
    pub user_message: Message,
    /// What went wrong.
    pub error: ChatError,
}

/// Why a compression attempt was abandoned.
#[derive(Debug, Error)]
pub(crate) enum CompressionError {
    #[error("no token: {0}")]
    Auth(#[from] ChatError),
    #[error("summarization request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("summarization returned no content")]
    Empty,
}
