//! Chat completion transport.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, instrument};

use crate::error::TransportError;
use crate::http::{HttpClient, error_from_response};
use crate::stream::EventStream;
use crate::wire::{ChatRequest, ChatResponse, ModelInfo, ModelsResponse};

/// Completions path under the API URL.
const COMPLETIONS_PATH: &str = "chat/completions";

/// Model listing path under the API URL.
const MODELS_PATH: &str = "models";

/// Executes chat requests against the completion API.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a single-shot request.
    async fn send(&self, request: &ChatRequest, token: &str)
    -> Result<ChatResponse, TransportError>;

    /// Opens a streamed request.
    ///
    /// A non-success status is returned as an error before any event is
    /// produced, so callers can react to 401.
    async fn open_stream(
        &self,
        request: &ChatRequest,
        token: &str,
    ) -> Result<EventStream, TransportError>;

    /// Opens a streamed request, reporting every failure as an `Error` event.
    async fn send_stream(&self, request: &ChatRequest, token: &str) -> EventStream {
        match self.open_stream(request, token).await {
            Ok(stream) => stream,
            Err(e) => EventStream::failed(e.to_string()),
        }
    }

    /// Lists available models.
    async fn list_models(&self, token: &str) -> Result<Vec<ModelInfo>, TransportError>;
}

/// [`ChatTransport`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    http: HttpClient,
    completions_url: String,
    models_url: String,
}

impl HttpChatTransport {
    /// Creates a transport for the API rooted at `api_url`.
    pub fn new(http: HttpClient, api_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            completions_url: HttpClient::endpoint(api_url, COMPLETIONS_PATH)?,
            models_url: HttpClient::endpoint(api_url, MODELS_PATH)?,
            http,
        })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    #[instrument(skip(self, request, token), fields(model = %request.model, messages = request.messages.len()))]
    async fn send(
        &self,
        request: &ChatRequest,
        token: &str,
    ) -> Result<ChatResponse, TransportError> {
        let builder = self
            .http
            .post(&self.completions_url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .json(request);
        let response = self.http.send(builder).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)?;
        debug!(choices = parsed.choices.len(), "Completion received");
        Ok(parsed)
    }

    #[instrument(skip(self, request, token), fields(model = %request.model, messages = request.messages.len()))]
    async fn open_stream(
        &self,
        request: &ChatRequest,
        token: &str,
    ) -> Result<EventStream, TransportError> {
        let mut body = request.clone();
        body.stream = Some(true);

        let builder = self
            .http
            .post_streaming(&self.completions_url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        let response = self.http.send(builder).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        debug!("Event stream opened");
        Ok(EventStream::from_response(
            response,
            Some(self.http.timeouts().stream_idle),
        ))
    }

    #[instrument(skip(self, token))]
    async fn list_models(&self, token: &str) -> Result<Vec<ModelInfo>, TransportError> {
        let response = self.http.get_with_bearer(&self.models_url, token).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let models: ModelsResponse = response.json().await?;
        debug!(count = models.data.len(), "Models listed");
        Ok(models.data)
    }
}
