//! Transport error types.

use thiserror::Error;

use crate::wire::ApiErrorBody;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, timeout, or body read failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider message, or the raw body if it could not be decoded.
        message: String,
    },

    /// A success response could not be decoded.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The token endpoint rejected the credentials.
    #[error("Auth failed: {0}")]
    Auth(String),

    /// Invalid endpoint or client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Returns true for an HTTP 401 from the API.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Api { status: 401, .. })
    }

    /// Returns the HTTP status, if the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Builds an API error from a non-success response body.
    ///
    /// Uses the provider's `{error:{message}}` when present.
    pub fn from_api_body(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => parsed.error.message,
            Err(_) => format!("API error: {status} - {body}"),
        };
        TransportError::Api { status, message }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Network(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            TransportError::Network(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_body_message_extracted() {
        let err = TransportError::from_api_body(
            400,
            r#"{"error":{"message":"bad model","type":"invalid_request_error"}}"#,
        );
        assert!(matches!(err, TransportError::Api { status: 400, ref message } if message == "bad model"));
    }

    #[test]
    fn test_api_body_fallback() {
        let err = TransportError::from_api_body(502, "upstream down");
        assert_eq!(err.to_string(), "API error (502): API error: 502 - upstream down");
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(TransportError::from_api_body(401, "").is_unauthorized());
        assert!(!TransportError::from_api_body(403, "").is_unauthorized());
        assert!(!TransportError::Auth("nope".into()).is_unauthorized());
    }
}
