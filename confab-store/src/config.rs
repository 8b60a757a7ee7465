//! Application configuration.
//!
//! Endpoints, timeouts and the token backend live in `config.json` under
//! the config directory. A few values can be overridden from the
//! environment, and the authorization key is resolved from the environment
//! or the system keychain, never from the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::keychain;
use crate::persistence::{default_config_path, load_json_sync, save_json_sync};

/// Default OAuth host.
pub const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2";
/// Default chat API host.
pub const DEFAULT_API_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";
/// Default OAuth scope.
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";

/// Environment variable overriding [`AppConfig::auth_url`].
pub const ENV_AUTH_URL: &str = "CONFAB_AUTH_URL";
/// Environment variable overriding [`AppConfig::api_url`].
pub const ENV_API_URL: &str = "CONFAB_API_URL";
/// Environment variable overriding [`AppConfig::scope`].
pub const ENV_SCOPE: &str = "CONFAB_SCOPE";
/// Environment variable holding the authorization key.
pub const ENV_AUTH_KEY: &str = "CONFAB_AUTH_KEY";

// ============================================================================
// Token Backend
// ============================================================================

/// Where access tokens are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    /// A JSON file in the data directory.
    #[default]
    File,
    /// The system keychain.
    Keychain,
}

impl TokenBackend {
    /// Parses a backend name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(TokenBackend::File),
            "keychain" => Some(TokenBackend::Keychain),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenBackend::File => write!(f, "file"),
            TokenBackend::Keychain => write!(f, "keychain"),
        }
    }
}

// ============================================================================
// App Config
// ============================================================================

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OAuth base URL; the token endpoint is `{auth_url}/oauth`.
    pub auth_url: String,
    /// Chat API base URL.
    pub api_url: String,
    /// OAuth scope sent with each token exchange.
    pub scope: String,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for non-streaming calls.
    pub request_timeout_secs: u64,
    /// Maximum silence between streamed chunks.
    pub stream_idle_timeout_secs: u64,
    /// Token persistence backend.
    pub token_backend: TokenBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
            stream_idle_timeout_secs: 60,
            token_backend: TokenBackend::File,
        }
    }
}

impl AppConfig {
    /// Keys accepted by [`AppConfig::set`].
    pub const KEYS: &'static [&'static str] = &[
        "auth_url",
        "api_url",
        "scope",
        "connect_timeout_secs",
        "request_timeout_secs",
        "stream_idle_timeout_secs",
        "token_backend",
    ];

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path and applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, StoreError> {
        let mut config = Self::load_from(&Self::default_path())?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads configuration from a specific path. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let config: AppConfig = load_json_sync(path)?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path())
    }

    /// Saves configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        save_json_sync(path, self)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Applies overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = read(ENV_AUTH_URL) {
            debug!(variable = ENV_AUTH_URL, "Overriding auth URL");
            self.auth_url = url;
        }
        if let Some(url) = read(ENV_API_URL) {
            debug!(variable = ENV_API_URL, "Overriding API URL");
            self.api_url = url;
        }
        if let Some(scope) = read(ENV_SCOPE) {
            debug!(variable = ENV_SCOPE, "Overriding scope");
            self.scope = scope;
        }
    }

    /// Sets one value by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for unknown keys or unparsable values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        let mut next = self.clone();
        match key {
            "auth_url" => next.auth_url = value.trim_end_matches('/').to_string(),
            "api_url" => next.api_url = value.trim_end_matches('/').to_string(),
            "scope" => next.scope = value.to_string(),
            "connect_timeout_secs" => next.connect_timeout_secs = parse_secs(key, value)?,
            "request_timeout_secs" => next.request_timeout_secs = parse_secs(key, value)?,
            "stream_idle_timeout_secs" => next.stream_idle_timeout_secs = parse_secs(key, value)?,
            "token_backend" => {
                next.token_backend = TokenBackend::parse(value).ok_or_else(|| {
                    StoreError::Config(format!(
                        "token_backend must be 'file' or 'keychain', got '{value}'"
                    ))
                })?;
            }
            _ => {
                return Err(StoreError::Config(format!(
                    "unknown key '{key}', expected one of: {}",
                    Self::KEYS.join(", ")
                )));
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Checks that URLs and scope are present and timeouts are positive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (name, url) in [("auth_url", &self.auth_url), ("api_url", &self.api_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(StoreError::Config(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.scope.trim().is_empty() {
            return Err(StoreError::Config("scope must not be empty".into()));
        }
        if self.connect_timeout_secs == 0
            || self.request_timeout_secs == 0
            || self.stream_idle_timeout_secs == 0
        {
            return Err(StoreError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }

    /// TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Stream idle timeout.
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Config(format!("{key} must be a whole number of seconds")))
}

// ============================================================================
// Authorization Key
// ============================================================================

/// Where the authorization key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKeySource {
    /// The `CONFAB_AUTH_KEY` environment variable.
    Environment,
    /// The system keychain.
    Keychain,
}

/// Resolves the authorization key: environment first, then keychain.
///
/// # Errors
///
/// Returns error if the keychain cannot be read.
pub fn resolve_auth_key() -> Result<Option<(String, AuthKeySource)>, StoreError> {
    resolve_auth_key_with(|name| std::env::var(name).ok(), || {
        keychain::get_secret(keychain::accounts::AUTH_KEY)
    })
}

/// Resolves the authorization key from the given lookups.
///
/// # Errors
///
/// Returns whatever error `keychain` returns.
pub fn resolve_auth_key_with<E, K>(
    env: E,
    keychain: K,
) -> Result<Option<(String, AuthKeySource)>, StoreError>
where
    E: Fn(&str) -> Option<String>,
    K: FnOnce() -> Result<Option<String>, StoreError>,
{
    if let Some(key) = env(ENV_AUTH_KEY).filter(|k| !k.trim().is_empty()) {
        return Ok(Some((key.trim().to_string(), AuthKeySource::Environment)));
    }
    Ok(keychain()?.map(|key| (key, AuthKeySource::Keychain)))
}

/// Saves the authorization key to the system keychain.
///
/// # Errors
///
/// Returns error if the key is blank or the keychain rejects the write.
pub fn store_auth_key(key: &str) -> Result<(), StoreError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(StoreError::Config("authorization key must not be empty".into()));
    }
    keychain::store_secret(keychain::accounts::AUTH_KEY, key)
}

/// Removes the authorization key from the system keychain.
///
/// # Errors
///
/// Returns error if the keychain deletion fails.
pub fn delete_auth_key() -> Result<(), StoreError> {
    keychain::delete_secret(keychain::accounts::AUTH_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.scope, "GIGACHAT_API_PERS");
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.token_backend, TokenBackend::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.set("api_url", "http://localhost:8080/api/v1/").unwrap();
        config.set("token_backend", "keychain").unwrap();
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_url, "http://localhost:8080/api/v1");
        assert_eq!(loaded.token_backend, TokenBackend::Keychain);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"scope":"GIGACHAT_API_CORP"}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.scope, "GIGACHAT_API_CORP");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            (ENV_API_URL, "http://127.0.0.1:9000"),
            (ENV_SCOPE, "  "),
        ]));
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = AppConfig::default();
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("request_timeout_secs", "soon").is_err());
        assert!(config.set("token_backend", "vault").is_err());
        assert!(config.set("auth_url", "ftp://x").is_err());
    }

    #[test]
    fn test_auth_key_prefers_environment() {
        let resolved = resolve_auth_key_with(env(&[(ENV_AUTH_KEY, " abc ")]), || {
            panic!("keychain should not be consulted")
        })
        .unwrap();
        assert_eq!(resolved, Some(("abc".to_string(), AuthKeySource::Environment)));
    }

    #[test]
    fn test_auth_key_falls_back_to_keychain() {
        let resolved =
            resolve_auth_key_with(env(&[]), || Ok(Some("from-keychain".into()))).unwrap();
        assert_eq!(
            resolved,
            Some(("from-keychain".to_string(), AuthKeySource::Keychain))
        );

        assert_eq!(resolve_auth_key_with(env(&[]), || Ok(None)).unwrap(), None);
    }
}
