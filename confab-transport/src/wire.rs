//! Wire types for the completion API.
//!
//! Request types serialize to the `chat/completions` body. Response types
//! tolerate unknown and missing fields.

use confab_core::{ChatSettings, Message, Role};
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// A message as sent to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user`, `assistant`, or `system`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

/// Body of a `chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model name.
    pub model: String,
    /// Conversation, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Completion token limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Whether to stream the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    /// Creates a request with no sampling overrides.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            stream: None,
        }
    }

    /// Creates a request using the model and sampling values from `settings`.
    pub fn from_settings(settings: &ChatSettings, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: settings.model.clone(),
            messages,
            max_tokens: Some(settings.max_tokens),
            temperature: Some(settings.temperature),
            stream: None,
        }
    }

    /// Sets the completion token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Returns a copy with streaming turned on.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.stream = Some(true);
        self
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Reply message inside a choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseMessage {
    /// Author role.
    #[serde(default)]
    pub role: Option<String>,
    /// Reply text.
    #[serde(default)]
    pub content: Option<String>,
}

/// One completion choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Choice {
    /// Choice index.
    #[serde(default)]
    pub index: u32,
    /// The reply.
    #[serde(default)]
    pub message: ResponseMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: usize,
    /// Completion tokens.
    #[serde(default)]
    pub completion_tokens: usize,
    /// Total tokens.
    #[serde(default)]
    pub total_tokens: usize,
}

/// A non-streaming `chat/completions` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    /// Choices, usually one.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Reported usage.
    #[serde(default)]
    pub usage: Option<Usage>,
    /// Model that produced the reply.
    #[serde(default)]
    pub model: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

/// Incremental delta inside a stream chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    /// Author role, usually only on the first chunk.
    #[serde(default)]
    pub role: Option<String>,
    /// Content fragment.
    #[serde(default)]
    pub content: Option<String>,
}

/// One choice inside a stream chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamChoice {
    /// Content delta.
    #[serde(default)]
    pub delta: Delta,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// A decoded `data:` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamChunk {
    /// Choices, usually one.
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

/// Error details in a non-success body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorDetail {
    /// Human-readable message.
    pub message: String,
    /// Error category.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Provider error code, string or number.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

/// Body of a non-success response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    /// The error.
    pub error: ApiErrorDetail,
}

/// Token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    /// Bearer token.
    pub access_token: String,
    /// Expiry, seconds or milliseconds since the epoch.
    pub expires_at: i64,
}

/// One entry of the `models` listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    /// Model ID.
    pub id: String,
    /// Owner, when reported.
    #[serde(default)]
    pub owned_by: Option<String>,
}

/// The `models` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelsResponse {
    /// Available models.
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}
