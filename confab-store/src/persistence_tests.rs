//! Persistence round-trip and edge case tests.
//!
//! Tests file I/O operations and how the stores share the on-disk layout.

use std::path::PathBuf;
use tempfile::TempDir;

use confab_core::{ChatSettings, ConversationStore, Message, TokenStore};

use crate::conversation_store::JsonConversationStore;
use crate::persistence::{load_json, load_json_or_default, save_json};
use crate::settings_store::SettingsStore;
use crate::token_store::FileTokenStore;

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_json_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let settings = ChatSettings {
        model: "GigaChat-Max".into(),
        max_tokens: 300,
        ..ChatSettings::default()
    };

    save_json(&file_path, &settings).await.unwrap();
    let loaded: ChatSettings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir
        .path()
        .join("deeply")
        .join("nested")
        .join("path")
        .join("test.json");

    let data = serde_json::json!({"key": "value"});

    assert!(save_json(&nested_path, &data).await.is_ok());
    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_save_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("data.json");

    save_json(&file_path, &serde_json::json!([1, 2, 3])).await.unwrap();

    assert!(!file_path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/settings.json");

    let result: Result<ChatSettings, _> = load_json(&file_path).await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_load_or_default_on_garbage() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");
    tokio::fs::write(&file_path, "\u{0}\u{1}").await.unwrap();

    let loaded: ChatSettings = load_json_or_default(&file_path).await;
    assert_eq!(loaded, ChatSettings::default());
}

// ============================================================================
// Store Layout Tests
// ============================================================================

#[tokio::test]
async fn test_stores_share_a_data_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("confab");

    let tokens = FileTokenStore::new(data_dir.join("token.json"));
    let history = JsonConversationStore::open(data_dir.join("conversation.json"))
        .await
        .unwrap();
    let settings = SettingsStore::new(temp_dir.path().join("config").join("settings.json"));

    tokens
        .save(&confab_core::AuthToken::new("t", 4_000_000_000))
        .unwrap();
    let mut message = Message::user("hello");
    message.mark_sent();
    history.append_message(&message).await.unwrap();
    settings.save().await.unwrap();

    let mut names: Vec<_> = std::fs::read_dir(&data_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["conversation.json", "token.json"]);
    assert!(settings.path().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_created_directories_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("private");
    save_json(&dir.join("x.json"), &1).await.unwrap();

    let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o700);
}
