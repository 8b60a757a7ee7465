//! In-crate fakes for the issuer and transport.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use confab_core::AuthToken;
use confab_transport::wire::ResponseMessage;
use confab_transport::{
    ChatRequest, ChatResponse, ChatTransport, Choice, EventStream, ModelInfo, TokenIssuer,
    TransportError, Usage,
};
use futures::StreamExt;

// ============================================================================
// Issuer
// ============================================================================

pub struct FakeIssuer {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl FakeIssuer {
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenIssuer for FakeIssuer {
    async fn issue_token(&self) -> Result<AuthToken, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(TransportError::Auth("401 - invalid key".into()));
        }
        Ok(AuthToken::new(
            format!("token-{n}"),
            Utc::now().timestamp() + 3600,
        ))
    }
}

// ============================================================================
// Transport
// ============================================================================

type Responder =
    Box<dyn Fn(&ChatRequest, &str) -> Result<ChatResponse, TransportError> + Send + Sync>;

/// A scripted stream: body chunks, or an error from `open_stream`.
pub type ScriptedStream = Result<Vec<String>, TransportError>;

pub struct FakeTransport {
    responder: Responder,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<(ChatRequest, String)>>,
    sends: AtomicUsize,
    opens: AtomicUsize,
}

impl FakeTransport {
    pub fn new(
        responder: impl Fn(&ChatRequest, &str) -> Result<ChatResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            sends: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
        }
    }

    /// Answers every request with `content`.
    pub fn replying(content: &'static str) -> Self {
        Self::new(move |_, _| Ok(reply(content)))
    }

    pub fn with_streams(self, streams: Vec<ScriptedStream>) -> Self {
        *self.streams.lock().unwrap() = streams.into();
        self
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().unwrap().0.clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(
        &self,
        request: &ChatRequest,
        token: &str,
    ) -> Result<ChatResponse, TransportError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), token.to_string()));
        (self.responder)(request, token)
    }

    async fn open_stream(
        &self,
        request: &ChatRequest,
        token: &str,
    ) -> Result<EventStream, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), token.to_string()));
        let next = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted stream".into())));
        let chunks = next?;
        let body = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from(c))),
        )
        .boxed();
        Ok(EventStream::new(body, None))
    }

    async fn list_models(&self, token: &str) -> Result<Vec<ModelInfo>, TransportError> {
        if token.is_empty() {
            return Err(TransportError::Api {
                status: 401,
                message: "no token".into(),
            });
        }
        Ok(["GigaChat", "GigaChat-Max"]
            .into_iter()
            .map(|id| ModelInfo {
                id: id.to_string(),
                owned_by: None,
            })
            .collect())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn reply(content: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: Some("assistant".into()),
                content: Some(content.to_string()),
            },
            finish_reason: Some("stop".into()),
        }],
        usage: None,
        model: None,
    }
}

pub fn reply_with_usage(content: &str, prompt: usize, completion: usize) -> ChatResponse {
    ChatResponse {
        usage: Some(Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }),
        ..reply(content)
    }
}

pub fn unauthorized() -> TransportError {
    TransportError::Api {
        status: 401,
        message: "Token has expired".into(),
    }
}

/// Returns true for a summarization request.
pub fn is_summary_request(request: &ChatRequest) -> bool {
    request.max_tokens == Some(crate::context::SUMMARY_MAX_TOKENS)
        && request
            .messages
            .last()
            .is_some_and(|m| m.content.starts_with(crate::prompts::SUMMARY_REQUEST_PREFIX))
}

pub fn data_frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": content}}]})
    )
}
