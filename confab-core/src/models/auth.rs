//! Authentication token and state types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Expiry values above this are interpreted as epoch milliseconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

// ============================================================================
// Auth Token
// ============================================================================

/// A bearer token issued by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// Opaque bearer credential.
    pub access_token: String,
    /// Expiry as epoch seconds.
    pub expires_at: i64,
}

impl AuthToken {
    /// Creates a token expiring at the given epoch second.
    pub fn new(access_token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Creates a token from a provider-reported expiry.
    ///
    /// Providers disagree on the unit; values that only make sense as
    /// milliseconds are converted to seconds.
    pub fn from_provider_expiry(access_token: impl Into<String>, expires_at: i64) -> Self {
        Self::new(access_token, normalize_expiry(expires_at))
    }

    /// Returns the expiry as a timestamp.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }

    /// Returns true if `now` is past the expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }

    /// Returns true if the token expires within `margin_secs` of `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        now.timestamp() >= self.expires_at - margin_secs
    }

    /// Seconds until expiry, negative once expired.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at - now.timestamp()
    }

    /// Returns a masked form of the access token suitable for logs.
    pub fn masked(&self) -> String {
        mask_secret(&self.access_token)
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &self.masked())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Converts a millisecond expiry to seconds, leaving seconds untouched.
pub fn normalize_expiry(expires_at: i64) -> i64 {
    if expires_at > MILLIS_THRESHOLD {
        expires_at / 1000
    } else {
        expires_at
    }
}

/// Masks a secret, keeping only a short prefix.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}

// ============================================================================
// Auth State
// ============================================================================

/// Observable authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No usable token.
    #[default]
    Unauthorized,
    /// A token exchange is in flight.
    Loading,
    /// A token is held.
    Authorized(AuthToken),
    /// The last exchange failed.
    Error(String),
}

impl AuthState {
    /// Returns the held token, if any.
    pub fn token(&self) -> Option<&AuthToken> {
        match self {
            AuthState::Authorized(token) => Some(token),
            _ => None,
        }
    }

    /// Returns true if a token is held.
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthState::Authorized(_))
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            AuthState::Unauthorized => "unauthorized",
            AuthState::Loading => "loading",
            AuthState::Authorized(_) => "authorized",
            AuthState::Error(_) => "error",
        }
    }
}
