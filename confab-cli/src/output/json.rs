//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use confab_core::{AuthState, Message, SendMessageResult, TokenUsage};
use confab_store::AuthKeySource;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one completed send.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyOutput {
    pub reply: String,
    pub message_id: String,
    pub usage: UsageOutput,
    pub compressed_count: usize,
}

/// Token usage for one reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOutput {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
    pub estimated: bool,
}

/// Authentication status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub state: String,
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub key_source: Option<String>,
}

/// A failed command.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub error: String,
}

impl From<&TokenUsage> for UsageOutput {
    fn from(usage: &TokenUsage) -> Self {
        let estimated = !usage.has_actual_data();
        Self {
            prompt_tokens: usage.prompt(),
            completion_tokens: usage.completion(),
            total_tokens: usage
                .actual_total
                .unwrap_or(usage.prompt() + usage.completion()),
            estimated,
        }
    }
}

impl From<&SendMessageResult> for ReplyOutput {
    fn from(result: &SendMessageResult) -> Self {
        let usage = result.message.token_usage.unwrap_or_default();
        Self {
            reply: result.message.content.clone(),
            message_id: result.message.id.clone(),
            usage: UsageOutput::from(&usage),
            compressed_count: result.compressed_count,
        }
    }
}

impl StatusOutput {
    /// Builds the status for `state` at `now`.
    pub fn new(state: &AuthState, key_source: Option<AuthKeySource>, now: DateTime<Utc>) -> Self {
        let token = state.token();
        Self {
            state: state.label().to_string(),
            authorized: token.is_some_and(|t| !t.is_expired(now)),
            token: token.map(confab_core::AuthToken::masked),
            expires_at: token.and_then(confab_core::AuthToken::expires_at_utc),
            seconds_remaining: token.map(|t| t.seconds_remaining(now)),
            error: match state {
                AuthState::Error(cause) => Some(cause.clone()),
                _ => None,
            },
            key_source: key_source.map(|s| match s {
                AuthKeySource::Environment => "environment".to_string(),
                AuthKeySource::Keychain => "keychain".to_string(),
            }),
        }
    }
}

// ============================================================================
// Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a completed send.
    pub fn format_reply(&self, result: &SendMessageResult) -> Result<String> {
        self.format(&ReplyOutput::from(result))
    }

    /// Formats an error.
    pub fn format_error(&self, error: &str) -> Result<String> {
        self.format(&ErrorOutput {
            error: error.to_string(),
        })
    }

    /// Formats conversation messages.
    pub fn format_messages(&self, messages: &[Message]) -> Result<String> {
        self.format(&messages)
    }
}
