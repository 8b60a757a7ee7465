//! Cumulative usage and exported conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ConversationWindow;
use super::message::TokenUsage;

/// Running token totals for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Prompt tokens, reported where available, else estimated.
    pub prompt_tokens: usize,
    /// Completion tokens, reported where available, else estimated.
    pub completion_tokens: usize,
    /// Completed exchanges.
    pub exchanges: usize,
}

impl UsageTotals {
    /// Adds one exchange.
    pub fn record(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += usage.prompt();
        self.completion_tokens += usage.completion();
        self.exchanges += 1;
    }

    /// Prompt plus completion tokens.
    pub fn total(&self) -> usize {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A conversation exported to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    /// Model in use at the time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Window contents.
    pub window: ConversationWindow,
    /// Usage totals at the time.
    #[serde(default)]
    pub usage: UsageTotals,
}

impl ConversationSnapshot {
    /// Captures `window` and `usage` now.
    pub fn new(window: ConversationWindow, usage: UsageTotals, model: Option<String>) -> Self {
        Self {
            saved_at: Utc::now(),
            model,
            window,
            usage,
        }
    }
}
