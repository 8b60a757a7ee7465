//! HTTP client with tracing and configured timeouts.
//!
//! Single-shot requests are bounded by the whole-request timeout. Streaming
//! requests only get the connect timeout here; idle reads are bounded by
//! [`crate::EventStream`].

use reqwest::{Client, RequestBuilder, Response, header};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::TransportError;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout for single-shot calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default maximum silence between streamed chunks.
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;

/// User agent string for Confab.
const USER_AGENT: &str = concat!("Confab/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Timeouts
// ============================================================================

/// Timeouts applied by [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP/TLS connect timeout.
    pub connect: Duration,
    /// Whole-request timeout for single-shot calls.
    pub request: Duration,
    /// Maximum silence between streamed chunks.
    pub stream_idle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stream_idle: Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
        }
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and timeouts.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeouts: Timeouts,
}

impl HttpClient {
    /// Creates a client with default timeouts.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeouts(Timeouts::default())
    }

    /// Creates a client with the given timeouts.
    pub fn with_timeouts(timeouts: Timeouts) -> Result<Self, TransportError> {
        let inner = Client::builder()
            .connect_timeout(timeouts.connect)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                TransportError::Config(format!(
                    "failed to create HTTP client: {e}. \
                    This usually indicates a broken TLS configuration."
                ))
            })?;
        Ok(Self { inner, timeouts })
    }

    /// Returns the configured timeouts.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Joins `path` onto `base`, tolerating a trailing slash on either side.
    pub fn endpoint(base: &str, path: &str) -> Result<String, TransportError> {
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map(|u| u.to_string())
            .map_err(|e| TransportError::Config(format!("invalid URL {joined}: {e}")))
    }

    /// Starts a POST request bounded by the request timeout.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.inner.post(url).timeout(self.timeouts.request)
    }

    /// Starts a POST request with no whole-request timeout, for streaming.
    pub fn post_streaming(&self, url: &str) -> RequestBuilder {
        self.inner
            .post(url)
            .header(header::ACCEPT, "text/event-stream")
    }

    /// Performs a GET request with a bearer token.
    #[instrument(skip(self, token), fields(url = %url))]
    pub async fn get_with_bearer(&self, url: &str, token: &str) -> Result<Response, TransportError> {
        debug!("GET request with auth");
        let response = self
            .inner
            .get(url)
            .timeout(self.timeouts.request)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Sends a prepared request, logging the status.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request.send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

/// Reads a non-success response into a [`TransportError::Api`].
pub async fn error_from_response(response: Response) -> TransportError {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => TransportError::from_api_body(status, &body),
        Err(e) => TransportError::Api {
            status,
            message: format!("API error: {status} - <unreadable body: {e}>"),
        },
    }
}
