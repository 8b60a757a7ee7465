// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Confab Store
//!
//! File and keychain persistence for Confab.
//!
//! This crate provides:
//!
//! - **AppConfig**: Endpoints, timeouts and the token backend
//! - **SettingsStore**: Chat settings with persistence and watch channels
//! - **Token stores**: File (0600) and keychain backends
//! - **JsonConversationStore**: Conversation history with compression markers
//! - **TranscriptStore**: Named snapshots for save/load
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use confab_store::{AppConfig, JsonConversationStore, SettingsStore, open_token_store};
//!
//! let config = AppConfig::load()?;
//! let settings = SettingsStore::load_default().await?;
//! let history = JsonConversationStore::open_default().await?;
//! let tokens = open_token_store(config.token_backend);
//!
//! let mut rx = settings.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("Settings updated!");
//! }
//! ```

pub mod config;
pub mod conversation_store;
pub mod error;
pub mod keychain;
pub mod persistence;
pub mod settings_store;
pub mod token_store;
pub mod transcripts;

pub use config::{
    AppConfig, AuthKeySource, DEFAULT_API_URL, DEFAULT_AUTH_URL, DEFAULT_SCOPE, TokenBackend,
    delete_auth_key, resolve_auth_key, store_auth_key,
};
pub use conversation_store::JsonConversationStore;
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, default_data_dir, default_history_path,
    default_settings_path, default_token_path, default_transcripts_dir, load_json,
    load_json_or_default, save_json,
};
pub use settings_store::{SETTING_KEYS, SettingsStore, apply_setting, parse_bool};
pub use token_store::{FileTokenStore, KeychainTokenStore, open_token_store};
pub use transcripts::TranscriptStore;

#[cfg(test)]
mod persistence_tests;
