//! Collaborator traits for Confab.
//!
//! The session layer depends only on these contracts. Concrete file,
//! keychain and in-memory implementations live in `confab-store` and
//! [`crate::memory`].

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{AuthToken, ChatSettings, ContextSummary, Message};

/// Persists the current bearer token.
///
/// Implementations are synchronous; they are called once at startup and
/// after each successful token exchange.
pub trait TokenStore: Send + Sync {
    /// Stores `token`, replacing any previous one.
    fn save(&self, token: &AuthToken) -> Result<(), CoreError>;

    /// Loads the stored token, if any.
    fn load(&self) -> Result<Option<AuthToken>, CoreError>;

    /// Removes the stored token.
    fn clear(&self) -> Result<(), CoreError>;
}

/// Supplies chat settings.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Returns the current settings.
    async fn load(&self) -> Result<ChatSettings, CoreError>;

    /// Replaces the settings.
    async fn save(&self, settings: &ChatSettings) -> Result<(), CoreError>;
}

/// Stores conversation history.
///
/// Messages appended here are the completed exchanges; the store marks them
/// compressed once folded into a summary so that `load_recent` only returns
/// what is still in the recent window.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends a message.
    async fn append_message(&self, message: &Message) -> Result<(), CoreError>;

    /// Marks the given messages as folded into `summary_id`.
    async fn mark_compressed(&self, message_ids: &[String], summary_id: &str)
    -> Result<(), CoreError>;

    /// Appends a summary.
    async fn insert_summary(&self, summary: &ContextSummary) -> Result<(), CoreError>;

    /// Returns uncompressed sent messages in insertion order.
    async fn load_recent(&self) -> Result<Vec<Message>, CoreError>;

    /// Returns all summaries in insertion order.
    async fn load_summaries(&self) -> Result<Vec<ContextSummary>, CoreError>;

    /// Removes all messages and summaries.
    async fn clear_all(&self) -> Result<(), CoreError>;
}
