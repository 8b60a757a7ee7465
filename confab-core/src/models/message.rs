//! Conversation message types.
//!
//! This module contains the types exchanged within a conversation:
//! - [`Message`] - A single user, assistant or system message
//! - [`Role`] - Who authored a message
//! - [`MessageStatus`] - Delivery status of a message
//! - [`TokenUsage`] - Estimated and reported token counts for an exchange

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Role
// ============================================================================

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human user.
    User,
    /// The model.
    Assistant,
    /// Instructions to the model.
    System,
}

impl Role {
    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Returns the label used when rendering transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Message Status
// ============================================================================

/// Delivery status of a message.
///
/// Transitions are `Sending -> Sent` or `Sending -> Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Awaiting a reply.
    #[default]
    Sending,
    /// Exchange completed.
    Sent,
    /// Exchange failed.
    Error,
}

// ============================================================================
// Token Usage
// ============================================================================

/// Token counts for one exchange.
///
/// Estimated fields are always populated from the local heuristic. Actual
/// fields are only present when the provider reports usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Locally estimated prompt tokens.
    pub estimated_prompt: usize,
    /// Locally estimated completion tokens.
    pub estimated_completion: usize,
    /// Prompt tokens reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_prompt: Option<usize>,
    /// Completion tokens reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_completion: Option<usize>,
    /// Total tokens reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_total: Option<usize>,
}

impl TokenUsage {
    /// Sum of the estimated prompt and completion tokens.
    pub fn estimated_total(&self) -> usize {
        self.estimated_prompt + self.estimated_completion
    }

    /// Returns true if the provider reported usage.
    pub fn has_actual_data(&self) -> bool {
        self.actual_prompt.is_some()
    }

    /// Prompt tokens, preferring the reported value.
    pub fn prompt(&self) -> usize {
        self.actual_prompt.unwrap_or(self.estimated_prompt)
    }

    /// Completion tokens, preferring the reported value.
    pub fn completion(&self) -> usize {
        self.actual_completion.unwrap_or(self.estimated_completion)
    }
}

// ============================================================================
// Message
// ============================================================================

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    pub id: String,
    /// Author of the message.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Delivery status.
    #[serde(default)]
    pub status: MessageStatus,
    /// Token usage for assistant replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl Message {
    /// Creates a message with a fresh ID and the current time.
    pub fn new(role: Role, content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            status,
            token_usage: None,
        }
    }

    /// Creates a user message that is waiting for a reply.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, MessageStatus::Sending)
    }

    /// Creates a completed assistant reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, MessageStatus::Sent)
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, MessageStatus::Sent)
    }

    /// Attaches token usage.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = Some(usage);
        self
    }

    /// Marks the message as sent. Returns false if it was already final.
    pub fn mark_sent(&mut self) -> bool {
        if self.status != MessageStatus::Sending {
            return false;
        }
        self.status = MessageStatus::Sent;
        true
    }

    /// Marks the message as failed. A sent message is never downgraded.
    pub fn mark_error(&mut self) -> bool {
        if self.status == MessageStatus::Sent {
            return false;
        }
        self.status = MessageStatus::Error;
        true
    }

    /// Returns true if the exchange completed.
    pub fn is_sent(&self) -> bool {
        self.status == MessageStatus::Sent
    }
}

// ============================================================================
// Tests
// ============================================================================
