//! Access token persistence.
//!
//! Two [`TokenStore`] backends: a JSON file with owner-only permissions and
//! the system keychain. [`open_token_store`] picks one from the config.

use confab_core::{AuthToken, CoreError, TokenStore};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::TokenBackend;
use crate::error::StoreError;
use crate::keychain;
use crate::persistence::{default_token_path, load_json_sync, remove_file_if_exists, save_json_sync};

// ============================================================================
// File Backend
// ============================================================================

/// Stores the token as JSON in a 0600 file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a store at the default token path.
    pub fn default_location() -> Self {
        Self::new(default_token_path())
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &AuthToken) -> Result<(), CoreError> {
        save_json_sync(&self.path, token)?;
        debug!(path = %self.path.display(), token = %token.masked(), "Token saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<AuthToken>, CoreError> {
        match load_json_sync::<AuthToken>(&self.path) {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(StoreError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable token file");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), CoreError> {
        remove_file_if_exists(&self.path)?;
        debug!(path = %self.path.display(), "Token cleared");
        Ok(())
    }
}

// ============================================================================
// Keychain Backend
// ============================================================================

/// Stores the token as JSON in the system keychain.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeychainTokenStore;

impl KeychainTokenStore {
    /// Creates a keychain-backed store.
    pub fn new() -> Self {
        Self
    }
}

impl TokenStore for KeychainTokenStore {
    fn save(&self, token: &AuthToken) -> Result<(), CoreError> {
        let json = serde_json::to_string(token)?;
        keychain::store_secret(keychain::accounts::ACCESS_TOKEN, &json)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<AuthToken>, CoreError> {
        let Some(json) = keychain::get_secret(keychain::accounts::ACCESS_TOKEN)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable keychain token");
                Ok(None)
            }
        }
    }

    fn clear(&self) -> Result<(), CoreError> {
        keychain::delete_secret(keychain::accounts::ACCESS_TOKEN)?;
        Ok(())
    }
}

/// Opens the token store selected by `backend`.
pub fn open_token_store(backend: TokenBackend) -> Box<dyn TokenStore> {
    match backend {
        TokenBackend::File => Box::new(FileTokenStore::default_location()),
        TokenBackend::Keychain => Box::new(KeychainTokenStore::new()),
    }
}
