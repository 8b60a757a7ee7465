//! Secret storage using the system keychain.
//!
//! This module provides synchronous access to the system's secure credential storage:
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)
//!
//! ## Usage
//!
//! ```ignore
//! use confab_store::keychain;
//!
//! keychain::store_secret(keychain::accounts::AUTH_KEY, "base64-key")?;
//!
//! if let Some(key) = keychain::get_secret(keychain::accounts::AUTH_KEY)? {
//!     println!("Key is configured");
//! }
//!
//! keychain::delete_secret(keychain::accounts::AUTH_KEY)?;
//! ```

use keyring::Entry;
use tracing::debug;

use crate::error::StoreError;

/// Keychain service name for Confab credentials.
pub const SERVICE: &str = "confab";

/// Account names used under [`SERVICE`].
pub mod accounts {
    /// The long-lived authorization key exchanged for access tokens.
    pub const AUTH_KEY: &str = "authorization_key";
    /// The current access token, serialized as JSON.
    pub const ACCESS_TOKEN: &str = "access_token";
}

fn entry(account: &str) -> Result<Entry, StoreError> {
    Ok(Entry::new(SERVICE, account)?)
}

/// Stores a secret in the system keychain.
///
/// # Errors
///
/// Returns [`StoreError::Keychain`] if the keychain rejects the write.
pub fn store_secret(account: &str, secret: &str) -> Result<(), StoreError> {
    entry(account)?.set_password(secret)?;
    debug!(account, "Secret stored in keychain");
    Ok(())
}

/// Retrieves a secret from the system keychain.
///
/// Returns `None` if no entry exists or the stored value is blank.
///
/// # Errors
///
/// Returns [`StoreError::Keychain`] if the keychain cannot be read.
pub fn get_secret(account: &str) -> Result<Option<String>, StoreError> {
    match entry(account)?.get_password() {
        Ok(secret) if secret.trim().is_empty() => Ok(None),
        Ok(secret) => {
            debug!(account, "Secret retrieved from keychain");
            Ok(Some(secret))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Deletes a secret from the system keychain. A missing entry is not an error.
///
/// # Errors
///
/// Returns [`StoreError::Keychain`] if the deletion fails.
pub fn delete_secret(account: &str) -> Result<(), StoreError> {
    match entry(account)?.delete_credential() {
        Ok(()) => {
            debug!(account, "Secret deleted from keychain");
            Ok(())
        }
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_names() {
        assert_eq!(SERVICE, "confab");
        assert_eq!(accounts::AUTH_KEY, "authorization_key");
        assert_ne!(accounts::AUTH_KEY, accounts::ACCESS_TOKEN);
    }

    // Keychain round-trips need platform access and are left to manual runs.
}
