//! Context window management.
//!
//! Decides when the recent window is too long, folds the oldest messages
//! into a summary produced by a secondary completion call, and builds the
//! message list sent to the API.

use std::sync::Arc;

use confab_core::{
    ChatSettings, ContextStats, ContextSummary, ConversationWindow, Message, MessageStatus,
    estimate_tokens, estimate_tokens_for,
};
use confab_transport::{ChatMessage, ChatRequest, ChatTransport};
use tracing::{debug, info, instrument, warn};

use crate::auth::TokenManager;
use crate::error::CompressionError;
use crate::prompts::{
    CONTEXT_HEADER, SUMMARIZATION_SYSTEM_PROMPT, SUMMARY_REQUEST_PREFIX, summary_label,
};

/// Sampling temperature for summarization.
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Completion limit for summarization.
pub const SUMMARY_MAX_TOKENS: u32 = 200;

/// Assumed token cost of a message that was folded into a summary.
pub const TOKENS_PER_FOLDED_MESSAGE: usize = 150;

/// Result of a successful compression.
#[derive(Debug, Clone, PartialEq)]
pub struct Compression {
    /// The new summary, already appended to the window.
    pub summary: ContextSummary,
    /// Messages removed from the recent window.
    pub folded: Vec<Message>,
}

impl Compression {
    /// Number of folded messages.
    pub fn count(&self) -> usize {
        self.folded.len()
    }

    /// IDs of the folded messages.
    pub fn folded_ids(&self) -> Vec<String> {
        self.folded.iter().map(|m| m.id.clone()).collect()
    }
}

/// Compresses and prepares the conversation context.
pub struct ContextWindowManager {
    transport: Arc<dyn ChatTransport>,
    tokens: Arc<TokenManager>,
}

impl ContextWindowManager {
    /// Creates a manager that summarizes through `transport`.
    pub fn new(transport: Arc<dyn ChatTransport>, tokens: Arc<TokenManager>) -> Self {
        Self { transport, tokens }
    }

    /// Returns true if a window of `recent_count` messages should be compressed.
    pub fn should_compress(recent_count: usize, settings: &ChatSettings) -> bool {
        settings.context_compression_enabled && recent_count > settings.compression_threshold
    }

    /// Compresses the window and returns how many messages were folded.
    ///
    /// Returns 0 and leaves the window unchanged on any failure.
    pub async fn compress(&self, window: &mut ConversationWindow, settings: &ChatSettings) -> usize {
        self.fold_oldest(window, settings)
            .await
            .map_or(0, |c| c.count())
    }

    /// Folds the oldest messages beyond `recent_messages_count` into a summary.
    ///
    /// A message that is still awaiting its reply is never folded.
    #[instrument(skip(self, window, settings), fields(recent = window.recent_len()))]
    pub async fn fold_oldest(
        &self,
        window: &mut ConversationWindow,
        settings: &ChatSettings,
    ) -> Option<Compression> {
        let excess = window
            .recent_len()
            .saturating_sub(settings.recent_messages_count);
        let settled = window
            .recent()
            .iter()
            .take_while(|m| m.status != MessageStatus::Sending)
            .count();
        let n = excess.min(settled);
        if n == 0 {
            return None;
        }

        let summary = match self.summarize(window.oldest(n), settings).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, count = n, "Context compression failed");
                return None;
            }
        };

        let folded = window.apply_compression(n, summary.clone());
        info!(count = folded.len(), summary_tokens = summary.estimated_tokens, "Context compressed");
        Some(Compression { summary, folded })
    }

    async fn summarize(
        &self,
        messages: &[Message],
        settings: &ChatSettings,
    ) -> Result<ContextSummary, CompressionError> {
        let request = summary_request(messages, settings);
        let token = self.tokens.get_valid_token().await?;
        let response = self.transport.send(&request, &token.access_token).await?;

        let content = response
            .first_content()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(CompressionError::Empty)?;
        debug!(chars = content.len(), "Summary received");

        Ok(ContextSummary::new(
            content,
            messages.len(),
            estimate_tokens(content),
        ))
    }

    /// Builds the outgoing list: one synthesized context message, if there
    /// are summaries, followed by the recent messages verbatim.
    pub fn prepare_context_for_api(
        summaries: &[ContextSummary],
        recent: &[Message],
    ) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(recent.len() + 1);
        if !summaries.is_empty() {
            let blocks: Vec<String> = summaries
                .iter()
                .map(|s| format!("{}\n{}", summary_label(s.original_message_count), s.content))
                .collect();
            out.push(ChatMessage::system(format!(
                "{CONTEXT_HEADER}\n{}",
                blocks.join("\n\n")
            )));
        }
        out.extend(recent.iter().map(ChatMessage::from));
        out
    }

    /// Estimates the token count of `text`.
    pub fn estimate_tokens(text: &str) -> usize {
        estimate_tokens(text)
    }

    /// Projects the window into display statistics.
    pub fn get_stats(summaries: &[ContextSummary], recent: &[Message]) -> ContextStats {
        let folded: usize = summaries.iter().map(|s| s.original_message_count).sum();
        let summary_tokens: usize = summaries.iter().map(|s| s.estimated_tokens).sum();
        let recent_tokens = estimate_tokens_for(recent.iter().map(|m| m.content.as_str()));
        let current = summary_tokens + recent_tokens;
        let uncompressed = folded * TOKENS_PER_FOLDED_MESSAGE + recent_tokens;

        ContextStats {
            recent_count: recent.len(),
            summary_block_count: summaries.len(),
            total_original_messages: folded + recent.len(),
            estimated_tokens_saved: uncompressed.saturating_sub(current),
            current_context_tokens: current,
        }
    }
}

impl std::fmt::Debug for ContextWindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextWindowManager").finish_non_exhaustive()
    }
}

/// Renders `messages` as a role-labeled transcript.
pub fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_request(messages: &[Message], settings: &ChatSettings) -> ChatRequest {
    ChatRequest::new(
        settings.model.clone(),
        vec![
            ChatMessage::system(SUMMARIZATION_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "{SUMMARY_REQUEST_PREFIX}\n\n{}",
                transcript(messages)
            )),
        ],
    )
    .with_temperature(SUMMARY_TEMPERATURE)
    .with_max_tokens(SUMMARY_MAX_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeIssuer, FakeTransport, is_summary_request, reply};
    use confab_core::{MemoryTokenStore, Role};
    use confab_transport::TransportError;

    fn manager(transport: Arc<FakeTransport>) -> ContextWindowManager {
        let tokens = Arc::new(TokenManager::new(
            Arc::new(FakeIssuer::succeeding()),
            Arc::new(MemoryTokenStore::new()),
        ));
        ContextWindowManager::new(transport, tokens)
    }

    /// `n` settled messages plus one pending user message.
    fn window(n: usize) -> ConversationWindow {
        let mut window = ConversationWindow::new();
        for i in 0..n {
            let msg = if i % 2 == 0 {
                let mut m = Message::user(format!("question {i}"));
                m.mark_sent();
                m
            } else {
                Message::assistant(format!("answer {i}"))
            };
            window.push(msg);
        }
        window.push(Message::user("pending"));
        window
    }

    #[test]
    fn test_should_compress_boundary() {
        let settings = ChatSettings::default();
        assert!(!ContextWindowManager::should_compress(20, &settings));
        assert!(ContextWindowManager::should_compress(21, &settings));

        let disabled = ChatSettings {
            context_compression_enabled: false,
            ..ChatSettings::default()
        };
        assert!(!ContextWindowManager::should_compress(100, &disabled));
    }

    #[tokio::test]
    async fn test_compress_folds_excess() {
        let transport = Arc::new(FakeTransport::replying("They talked about Rust."));
        let manager = manager(transport.clone());
        let mut window = window(20);
        let first_kept = window.recent()[11].id.clone();

        let count = manager.compress(&mut window, &ChatSettings::default()).await;

        assert_eq!(count, 11);
        assert_eq!(window.recent_len(), 10);
        assert_eq!(window.recent()[0].id, first_kept);
        assert_eq!(window.summaries().len(), 1);
        assert_eq!(window.summaries()[0].original_message_count, 11);
        assert_eq!(window.summaries()[0].content, "They talked about Rust.");

        let request = transport.last_request();
        assert!(is_summary_request(&request));
        assert_eq!(request.temperature, Some(SUMMARY_TEMPERATURE));
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[1].content.contains("User: question 0\nAssistant: answer 1"));
    }

    #[tokio::test]
    async fn test_compress_noop_when_within_limit() {
        let transport = Arc::new(FakeTransport::replying("unused"));
        let manager = manager(transport.clone());
        let mut window = window(5);

        assert_eq!(manager.compress(&mut window, &ChatSettings::default()).await, 0);
        assert_eq!(transport.sends(), 0);
        assert_eq!(window.recent_len(), 6);
    }

    #[tokio::test]
    async fn test_failed_compression_leaves_window() {
        let transport = Arc::new(FakeTransport::new(|_, _| {
            Err(TransportError::Network("connection refused".into()))
        }));
        let manager = manager(transport);
        let mut window = window(20);
        let before = window.clone();

        assert_eq!(manager.compress(&mut window, &ChatSettings::default()).await, 0);
        assert_eq!(window, before);
    }

    #[tokio::test]
    async fn test_empty_summary_is_failure() {
        let transport = Arc::new(FakeTransport::new(|_, _| Ok(reply("   "))));
        let manager = manager(transport);
        let mut window = window(20);

        assert_eq!(manager.compress(&mut window, &ChatSettings::default()).await, 0);
        assert!(window.summaries().is_empty());
    }

    #[tokio::test]
    async fn test_pending_message_never_folded() {
        let transport = Arc::new(FakeTransport::replying("summary"));
        let manager = manager(transport);
        let mut window = window(4);
        let settings = ChatSettings {
            compression_threshold: 2,
            recent_messages_count: 0,
            ..ChatSettings::default()
        };

        assert_eq!(manager.compress(&mut window, &settings).await, 4);
        assert_eq!(window.recent_len(), 1);
        assert_eq!(window.recent()[0].content, "pending");
    }

    #[test]
    fn test_prepare_without_summaries_is_verbatim() {
        let recent = vec![Message::user("a"), Message::assistant("b")];
        let prepared = ContextWindowManager::prepare_context_for_api(&[], &recent);
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].content, "a");
        assert_eq!(prepared[1].role, "assistant");
    }

    #[test]
    fn test_prepare_with_summaries_single_system_message() {
        let summaries = vec![
            ContextSummary::new("first part", 11, 3),
            ContextSummary::new("second part", 4, 3),
        ];
        let recent = vec![Message::user("latest")];
        let prepared = ContextWindowManager::prepare_context_for_api(&summaries, &recent);

        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared.iter().filter(|m| m.role == "system").count(), 1);
        assert_eq!(prepared[0].role, "system");
        assert_eq!(
            prepared[0].content,
            "Context of previous conversation:\n\
             [Summary of previous dialog (11 messages)]:\nfirst part\n\n\
             [Summary of previous dialog (4 messages)]:\nsecond part"
        );
        assert_eq!(prepared[1].content, "latest");
    }

    #[test]
    fn test_stats_projection() {
        let summaries = vec![ContextSummary::new("s", 2, 10)];
        let recent = vec![Message::new(Role::User, "abcdefghijklmnop", MessageStatus::Sent)];
        let stats = ContextWindowManager::get_stats(&summaries, &recent);

        assert_eq!(stats.recent_count, 1);
        assert_eq!(stats.summary_block_count, 1);
        assert_eq!(stats.total_original_messages, 3);
        assert_eq!(stats.current_context_tokens, 14);
        assert_eq!(stats.estimated_tokens_saved, 290);
    }

    #[test]
    fn test_stats_saved_never_negative() {
        let summaries = vec![ContextSummary::new("long", 1, 500)];
        let stats = ContextWindowManager::get_stats(&summaries, &[]);
        assert_eq!(stats.estimated_tokens_saved, 0);
    }
}
