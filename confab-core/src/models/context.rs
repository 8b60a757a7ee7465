//! Conversation window and compression summaries.
//!
//! The window holds the recent, uncompressed messages together with the
//! ordered summaries that replaced older messages. Every message is either
//! in `recent` or folded into exactly one summary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

// ============================================================================
// Context Summary
// ============================================================================

/// A summary that replaced a run of older messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSummary {
    /// Unique summary ID.
    pub id: String,
    /// Summary text.
    pub content: String,
    /// How many messages were folded into this summary.
    pub original_message_count: usize,
    /// Estimated token size of `content`.
    pub estimated_tokens: usize,
}

impl ContextSummary {
    /// Creates a summary with a fresh ID.
    pub fn new(
        content: impl Into<String>,
        original_message_count: usize,
        estimated_tokens: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            original_message_count,
            estimated_tokens,
        }
    }
}

// ============================================================================
// Context Stats
// ============================================================================

/// Read-only projection of the window for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextStats {
    /// Messages currently in the recent window.
    pub recent_count: usize,
    /// Number of summaries.
    pub summary_block_count: usize,
    /// Messages folded into summaries.
    pub total_original_messages: usize,
    /// Estimated tokens saved by compression.
    pub estimated_tokens_saved: usize,
    /// Estimated tokens of the context that would be sent now.
    pub current_context_tokens: usize,
}

// ============================================================================
// Conversation Window
// ============================================================================

/// Recent messages plus the summaries of everything older.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationWindow {
    recent: Vec<Message>,
    summaries: Vec<ContextSummary>,
}

impl ConversationWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a window from stored parts.
    pub fn from_parts(recent: Vec<Message>, summaries: Vec<ContextSummary>) -> Self {
        Self { recent, summaries }
    }

    /// Recent, uncompressed messages in chronological order.
    pub fn recent(&self) -> &[Message] {
        &self.recent
    }

    /// Summaries in insertion order.
    pub fn summaries(&self) -> &[ContextSummary] {
        &self.summaries
    }

    /// Number of recent messages.
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Returns true if there are no messages and no summaries.
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.summaries.is_empty()
    }

    /// Total messages folded into summaries.
    pub fn folded_message_count(&self) -> usize {
        self.summaries.iter().map(|s| s.original_message_count).sum()
    }

    /// Appends a message to the recent window.
    pub fn push(&mut self, message: Message) {
        self.recent.push(message);
    }

    /// Returns the `n` oldest recent messages.
    pub fn oldest(&self, n: usize) -> &[Message] {
        &self.recent[..n.min(self.recent.len())]
    }

    /// Folds the `n` oldest recent messages into `summary`.
    ///
    /// Returns the removed messages. Nothing changes if `n` is zero or
    /// larger than the recent window.
    pub fn apply_compression(&mut self, n: usize, summary: ContextSummary) -> Vec<Message> {
        if n == 0 || n > self.recent.len() {
            return Vec::new();
        }
        let folded: Vec<Message> = self.recent.drain(..n).collect();
        self.summaries.push(summary);
        folded
    }

    /// Finds a recent message by ID.
    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.recent.iter_mut().find(|m| m.id == id)
    }

    /// Removes the last recent message if its ID matches.
    pub fn remove_last_if(&mut self, id: &str) -> Option<Message> {
        if self.recent.last().is_some_and(|m| m.id == id) {
            self.recent.pop()
        } else {
            None
        }
    }

    /// Removes all messages and summaries.
    pub fn clear(&mut self) {
        self.recent.clear();
        self.summaries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_with(n: usize) -> ConversationWindow {
        let mut window = ConversationWindow::new();
        for i in 0..n {
            window.push(Message::user(format!("message {i}")));
        }
        window
    }

    #[test]
    fn test_apply_compression_moves_oldest() {
        let mut window = window_with(5);
        let third_id = window.recent()[2].id.clone();

        let folded = window.apply_compression(2, ContextSummary::new("sum", 2, 1));

        assert_eq!(folded.len(), 2);
        assert_eq!(window.recent_len(), 3);
        assert_eq!(window.recent()[0].id, third_id);
        assert_eq!(window.summaries().len(), 1);
        assert_eq!(window.folded_message_count(), 2);
    }

    #[test]
    fn test_apply_compression_out_of_range_is_noop() {
        let mut window = window_with(2);
        assert!(window.apply_compression(3, ContextSummary::new("s", 3, 1)).is_empty());
        assert!(window.apply_compression(0, ContextSummary::new("s", 0, 1)).is_empty());
        assert_eq!(window.recent_len(), 2);
        assert!(window.summaries().is_empty());
    }

    #[test]
    fn test_remove_last_if_requires_match() {
        let mut window = window_with(2);
        let first_id = window.recent()[0].id.clone();
        let last_id = window.recent()[1].id.clone();

        assert!(window.remove_last_if(&first_id).is_none());
        assert_eq!(window.remove_last_if(&last_id).map(|m| m.id), Some(last_id));
        assert_eq!(window.recent_len(), 1);
    }
}
