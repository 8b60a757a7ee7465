//! In-memory collaborators.
//!
//! Used for tests and for sessions that should not touch the disk.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{AuthToken, ChatSettings, ContextSummary, Message};
use crate::traits::{ConversationStore, SettingsSource, TokenStore};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, CoreError> {
    mutex
        .lock()
        .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))
}

// ============================================================================
// Token Store
// ============================================================================

/// Token store that keeps the token in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AuthToken>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `token`.
    pub fn with_token(token: AuthToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &AuthToken) -> Result<(), CoreError> {
        *lock(&self.token)? = Some(token.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<AuthToken>, CoreError> {
        Ok(lock(&self.token)?.clone())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *lock(&self.token)? = None;
        Ok(())
    }
}

// ============================================================================
// Settings Source
// ============================================================================

/// Settings source that keeps settings in memory.
#[derive(Debug, Default)]
pub struct MemorySettingsSource {
    settings: Mutex<ChatSettings>,
}

impl MemorySettingsSource {
    /// Creates a source holding `settings`.
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

#[async_trait]
impl SettingsSource for MemorySettingsSource {
    async fn load(&self) -> Result<ChatSettings, CoreError> {
        Ok(lock(&self.settings)?.clone())
    }

    async fn save(&self, settings: &ChatSettings) -> Result<(), CoreError> {
        settings.validate()?;
        *lock(&self.settings)? = settings.clone();
        Ok(())
    }
}

// ============================================================================
// Conversation Store
// ============================================================================

#[derive(Debug, Default)]
struct Conversation {
    messages: Vec<(Message, Option<String>)>,
    summaries: Vec<ContextSummary>,
}

/// Conversation store that keeps history in memory.
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    inner: Mutex<Conversation>,
}

impl MemoryConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total messages stored, compressed or not.
    pub fn message_count(&self) -> usize {
        lock(&self.inner).map(|c| c.messages.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn append_message(&self, message: &Message) -> Result<(), CoreError> {
        lock(&self.inner)?.messages.push((message.clone(), None));
        Ok(())
    }

    async fn mark_compressed(
        &self,
        message_ids: &[String],
        summary_id: &str,
    ) -> Result<(), CoreError> {
        let mut inner = lock(&self.inner)?;
        for (message, marker) in &mut inner.messages {
            if message_ids.contains(&message.id) {
                *marker = Some(summary_id.to_string());
            }
        }
        Ok(())
    }

    async fn insert_summary(&self, summary: &ContextSummary) -> Result<(), CoreError> {
        lock(&self.inner)?.summaries.push(summary.clone());
        Ok(())
    }

    async fn load_recent(&self) -> Result<Vec<Message>, CoreError> {
        Ok(lock(&self.inner)?
            .messages
            .iter()
            .filter(|(m, marker)| marker.is_none() && m.is_sent())
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn load_summaries(&self) -> Result<Vec<ContextSummary>, CoreError> {
        Ok(lock(&self.inner)?.summaries.clone())
    }

    async fn clear_all(&self) -> Result<(), CoreError> {
        let mut inner = lock(&self.inner)?;
        inner.messages.clear();
        inner.summaries.clear();
        Ok(())
    }
}
