//! JSON-file conversation history.
//!
//! The whole history is a single document rewritten atomically on every
//! change. Messages folded into a summary stay in the file with their
//! `summary_id` set, so the full dialog remains on disk while
//! [`ConversationStore::load_recent`] only returns the live window.

use async_trait::async_trait;
use confab_core::{ContextSummary, ConversationStore, CoreError, Message};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::{default_history_path, load_json, save_json};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    #[serde(flatten)]
    message: Message,
    #[serde(default)]
    compressed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    messages: Vec<StoredMessage>,
    #[serde(default)]
    summaries: Vec<ContextSummary>,
}

/// Conversation history persisted to one JSON file.
#[derive(Debug)]
pub struct JsonConversationStore {
    path: PathBuf,
    document: Mutex<HistoryDocument>,
}

impl JsonConversationStore {
    /// Opens the history at `path`. A missing file starts empty.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let document = match load_json::<HistoryDocument>(&path).await {
            Ok(document) => document,
            Err(e) if e.is_not_found() => HistoryDocument::default(),
            Err(e) => return Err(e),
        };
        debug!(
            path = %path.display(),
            messages = document.messages.len(),
            summaries = document.summaries.len(),
            "Opened conversation history"
        );
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Opens the history at the default path.
    ///
    /// A corrupt file is set aside as `conversation.json.bak` and an empty
    /// history is started.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or moved aside.
    pub async fn open_default() -> Result<Self, StoreError> {
        let path = default_history_path();
        match Self::open(path.clone()).await {
            Err(StoreError::Serialization(e)) => {
                warn!(path = %path.display(), error = %e, "Conversation history is corrupt, starting fresh");
                tokio::fs::rename(&path, path.with_extension("json.bak")).await?;
                Self::open(path).await
            }
            other => other,
        }
    }

    /// Path of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored messages, compressed or not.
    pub async fn message_count(&self) -> usize {
        self.document.lock().await.messages.len()
    }

    async fn persist(&self, document: &HistoryDocument) -> Result<(), CoreError> {
        save_json(&self.path, document).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for JsonConversationStore {
    async fn append_message(&self, message: &Message) -> Result<(), CoreError> {
        let mut document = self.document.lock().await;
        document.messages.push(StoredMessage {
            message: message.clone(),
            compressed: false,
            summary_id: None,
        });
        self.persist(&document).await
    }

    async fn mark_compressed(
        &self,
        message_ids: &[String],
        summary_id: &str,
    ) -> Result<(), CoreError> {
        let mut document = self.document.lock().await;
        let mut marked = 0usize;
        for stored in &mut document.messages {
            if message_ids.contains(&stored.message.id) {
                stored.compressed = true;
                stored.summary_id = Some(summary_id.to_string());
                marked += 1;
            }
        }
        debug!(marked, summary_id, "Marked messages compressed");
        self.persist(&document).await
    }

    async fn insert_summary(&self, summary: &ContextSummary) -> Result<(), CoreError> {
        let mut document = self.document.lock().await;
        document.summaries.push(summary.clone());
        self.persist(&document).await
    }

    async fn load_recent(&self) -> Result<Vec<Message>, CoreError> {
        let document = self.document.lock().await;
        Ok(document
            .messages
            .iter()
            .filter(|s| !s.compressed && s.message.is_sent())
            .map(|s| s.message.clone())
            .collect())
    }

    async fn load_summaries(&self) -> Result<Vec<ContextSummary>, CoreError> {
        Ok(self.document.lock().await.summaries.clone())
    }

    async fn clear_all(&self) -> Result<(), CoreError> {
        let mut document = self.document.lock().await;
        *document = HistoryDocument::default();
        self.persist(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent_user(text: &str) -> Message {
        let mut message = Message::user(text);
        message.mark_sent();
        message
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonConversationStore::open(dir.path().join("conversation.json"))
            .await
            .unwrap();
        assert!(store.load_recent().await.unwrap().is_empty());
        assert!(store.load_summaries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");

        let first = sent_user("first");
        let second = Message::assistant("second");
        {
            let store = JsonConversationStore::open(path.clone()).await.unwrap();
            store.append_message(&first).await.unwrap();
            store.append_message(&second).await.unwrap();
        }

        let store = JsonConversationStore::open(path).await.unwrap();
        let recent = store.load_recent().await.unwrap();
        assert_eq!(recent, vec![first, second]);
    }

    #[tokio::test]
    async fn test_compressed_messages_leave_recent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        let store = JsonConversationStore::open(path.clone()).await.unwrap();

        let old = sent_user("old");
        let kept = sent_user("kept");
        store.append_message(&old).await.unwrap();
        store.append_message(&kept).await.unwrap();

        let summary = ContextSummary::new("they talked about old things", 1, 7);
        store.insert_summary(&summary).await.unwrap();
        store
            .mark_compressed(std::slice::from_ref(&old.id), &summary.id)
            .await
            .unwrap();

        let reopened = JsonConversationStore::open(path).await.unwrap();
        assert_eq!(reopened.load_recent().await.unwrap(), vec![kept]);
        assert_eq!(reopened.load_summaries().await.unwrap(), vec![summary]);
        assert_eq!(reopened.message_count().await, 2);
    }

    #[tokio::test]
    async fn test_unsent_messages_are_not_recent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonConversationStore::open(dir.path().join("c.json")).await.unwrap();

        let mut failed = Message::user("lost");
        failed.mark_error();
        store.append_message(&failed).await.unwrap();

        assert!(store.load_recent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        let store = JsonConversationStore::open(path.clone()).await.unwrap();
        store.append_message(&sent_user("hi")).await.unwrap();

        store.clear_all().await.unwrap();

        let reopened = JsonConversationStore::open(path).await.unwrap();
        assert_eq!(reopened.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let result = JsonConversationStore::open(path).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
