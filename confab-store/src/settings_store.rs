//! Chat settings storage.
//!
//! [`SettingsStore`] keeps [`ChatSettings`] in memory, persists them as JSON
//! and notifies subscribers on every change. It is the production
//! [`SettingsSource`] handed to the chat session.

use async_trait::async_trait;
use confab_core::{ChatSettings, CoreError, OutputFormat, SettingsSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

/// Keys accepted by [`apply_setting`].
pub const SETTING_KEYS: &[&str] = &[
    "model",
    "temperature",
    "max_tokens",
    "system_prompt",
    "output_format",
    "compression",
    "compression_threshold",
    "recent_messages_count",
    "streaming",
];

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent chat settings with change notifications.
#[derive(Debug)]
pub struct SettingsStore {
    settings: Arc<RwLock<ChatSettings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a store holding default settings.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, ChatSettings::default())
    }

    fn with_settings(path: PathBuf, settings: ChatSettings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing, unreadable or invalid file falls back to defaults.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for parity with other loaders.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            match load_json::<ChatSettings>(&path).await {
                Ok(settings) => match settings.validate() {
                    Ok(()) => settings,
                    Err(e) => {
                        warn!(error = %e, "Stored settings are invalid, using defaults");
                        ChatSettings::default()
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Failed to load settings, using defaults");
                    ChatSettings::default()
                }
            }
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            ChatSettings::default()
        };

        Ok(Self::with_settings(path, settings))
    }

    /// Path the settings are saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> ChatSettings {
        self.settings.read().await.clone()
    }

    /// Applies `f` to a copy of the settings and commits it if it validates.
    ///
    /// # Errors
    ///
    /// Returns the validation error; the stored settings are unchanged.
    pub async fn update<F>(&self, f: F) -> Result<ChatSettings, StoreError>
    where
        F: FnOnce(&mut ChatSettings),
    {
        let updated = {
            let mut settings = self.settings.write().await;
            let mut next = settings.clone();
            f(&mut next);
            next.validate().map_err(|e| StoreError::Config(e.to_string()))?;
            *settings = next.clone();
            next
        };
        self.notify_change().await;
        Ok(updated)
    }

    /// Sets one value by key, then saves.
    ///
    /// # Errors
    ///
    /// Returns error if the key or value is invalid or saving fails.
    pub async fn set(&self, key: &str, value: &str) -> Result<ChatSettings, StoreError> {
        let mut probe = self.get().await;
        apply_setting(&mut probe, key, value)?;

        let updated = self.update(|s| *s = probe).await?;
        self.save().await?;
        Ok(updated)
    }

    /// Restores defaults, then saves.
    ///
    /// # Errors
    ///
    /// Returns error if saving fails.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.update(|s| *s = ChatSettings::default()).await?;
        self.save().await
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await.clone();
        save_json(&self.path, &settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes. The value is a change counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }
}

#[async_trait]
impl SettingsSource for SettingsStore {
    async fn load(&self) -> Result<ChatSettings, CoreError> {
        Ok(self.get().await)
    }

    async fn save(&self, settings: &ChatSettings) -> Result<(), CoreError> {
        let replacement = settings.clone();
        self.update(|s| *s = replacement).await?;
        SettingsStore::save(self).await?;
        Ok(())
    }
}

// ============================================================================
// Key/Value Editing
// ============================================================================

/// Parses `value` and stores it under `key` in `settings`.
///
/// Ranges are not checked here; see [`ChatSettings::validate`].
///
/// # Errors
///
/// Returns [`StoreError::Config`] for unknown keys or unparsable values.
pub fn apply_setting(settings: &mut ChatSettings, key: &str, value: &str) -> Result<(), StoreError> {
    let value = value.trim();
    let invalid = |expected: &str| {
        StoreError::Config(format!("{key} expects {expected}, got '{value}'"))
    };

    match key {
        "model" => settings.model = value.to_string(),
        "temperature" => settings.temperature = value.parse().map_err(|_| invalid("a number"))?,
        "max_tokens" => settings.max_tokens = value.parse().map_err(|_| invalid("an integer"))?,
        "system_prompt" => settings.system_prompt = value.to_string(),
        "output_format" | "format" => {
            settings.output_format =
                OutputFormat::parse(value).ok_or_else(|| invalid("'none' or 'json'"))?;
        }
        "compression" | "context_compression_enabled" => {
            settings.context_compression_enabled = parse_bool(value).ok_or_else(|| invalid("on/off"))?;
        }
        "compression_threshold" => {
            settings.compression_threshold = value.parse().map_err(|_| invalid("an integer"))?;
        }
        "recent_messages_count" => {
            settings.recent_messages_count = value.parse().map_err(|_| invalid("an integer"))?;
        }
        "streaming" | "stream" => {
            settings.streaming = parse_bool(value).ok_or_else(|| invalid("on/off"))?;
        }
        _ => {
            return Err(StoreError::Config(format!(
                "unknown setting '{key}', expected one of: {}",
                SETTING_KEYS.join(", ")
            )));
        }
    }
    Ok(())
}

/// Parses on/off style booleans.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let mut rx = store.subscribe();

        store.update(|s| s.model = "GigaChat-Pro".into()).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(store.get().await.model, "GigaChat-Pro");
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let mut rx = store.subscribe();

        let result = store.update(|s| s.temperature = 3.0).await;

        assert!(result.is_err());
        assert!((store.get().await.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone());

        store.set("max_tokens", "512").await.unwrap();
        store.set("format", "json").await.unwrap();

        let reloaded = SettingsStore::load(path).await.unwrap();
        let settings = reloaded.get().await;
        assert_eq!(settings.max_tokens, 512);
        assert_eq!(settings.output_format, OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::load(path).await.unwrap();
        assert_eq!(store.get().await, ChatSettings::default());
    }

    #[tokio::test]
    async fn test_settings_source_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let source: &dyn SettingsSource = &store;

        let mut settings = source.load().await.unwrap();
        settings.streaming = true;
        source.save(&settings).await.unwrap();

        assert!(source.load().await.unwrap().streaming);
        assert!(store.path().exists());
    }

    #[test]
    fn test_apply_setting_errors() {
        let mut settings = ChatSettings::default();
        assert!(apply_setting(&mut settings, "temperature", "warm").is_err());
        assert!(apply_setting(&mut settings, "streaming", "maybe").is_err());
        assert!(apply_setting(&mut settings, "colour", "red").is_err());

        apply_setting(&mut settings, "compression", "off").unwrap();
        assert!(!settings.context_compression_enabled);
    }
}
