//! Bearer token lifecycle.
//!
//! [`TokenManager`] owns the current [`AuthState`] and guarantees that at
//! most one credential exchange is in flight. Callers that queued behind an
//! exchange adopt its outcome instead of starting another.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use confab_core::{AuthState, AuthToken, TokenStore};
use confab_transport::TokenIssuer;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::error::ChatError;

/// Tokens expiring within this many seconds are refreshed.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Manages the bearer token.
pub struct TokenManager {
    issuer: Arc<dyn TokenIssuer>,
    store: Arc<dyn TokenStore>,
    /// Outcome of the latest exchange. Held for the whole exchange.
    last: Mutex<Option<Result<AuthToken, String>>>,
    /// Bumped after every exchange, read before queueing on `last`.
    exchanges: AtomicU64,
    state: watch::Sender<AuthState>,
}

impl TokenManager {
    /// Creates a manager, seeding it from the store.
    ///
    /// A stored token that has not expired is used without a network call.
    pub fn new(issuer: Arc<dyn TokenIssuer>, store: Arc<dyn TokenStore>) -> Self {
        let initial = match store.load() {
            Ok(Some(token)) if !token.is_expired(Utc::now()) => {
                debug!(expires_at = token.expires_at, "Using stored token");
                AuthState::Authorized(token)
            }
            Ok(Some(_)) => {
                debug!("Stored token expired");
                AuthState::Unauthorized
            }
            Ok(None) => AuthState::Unauthorized,
            Err(e) => {
                warn!(error = %e, "Failed to load stored token");
                AuthState::Unauthorized
            }
        };
        let (state, _) = watch::channel(initial);
        Self {
            issuer,
            store,
            last: Mutex::new(None),
            exchanges: AtomicU64::new(0),
            state,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Number of exchanges performed so far.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Performs the initial credential exchange.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<AuthToken, ChatError> {
        let observed = self.exchange_count();
        let mut last = self.last.lock().await;
        if let Some(shared) = self.adopt(observed, &last) {
            return shared;
        }
        self.exchange(&mut last).await
    }

    /// Returns a token that is valid for at least the refresh margin.
    ///
    /// No network call is made while the held token is fresh.
    #[instrument(skip(self))]
    pub async fn get_valid_token(&self) -> Result<AuthToken, ChatError> {
        let observed = self.exchange_count();
        let mut last = self.last.lock().await;
        if let Some(shared) = self.adopt(observed, &last) {
            return shared;
        }
        let fresh = self
            .state
            .borrow()
            .token()
            .filter(|t| !t.needs_refresh(Utc::now(), TOKEN_REFRESH_MARGIN_SECS))
            .cloned();
        if let Some(token) = fresh {
            return Ok(token);
        }
        debug!("Token missing or about to expire");
        self.exchange(&mut last).await
    }

    /// Forces a new exchange, typically after a 401.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<AuthToken, ChatError> {
        let observed = self.exchange_count();
        let mut last = self.last.lock().await;
        if let Some(shared) = self.adopt(observed, &last) {
            return shared;
        }
        self.exchange(&mut last).await
    }

    /// Clears the stored token and resets to `Unauthorized`.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let mut last = self.last.lock().await;
        *last = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        self.state.send_replace(AuthState::Unauthorized);
        info!("Logged out");
    }

    /// Returns the outcome of an exchange that finished while we queued.
    fn adopt(
        &self,
        observed: u64,
        last: &Option<Result<AuthToken, String>>,
    ) -> Option<Result<AuthToken, ChatError>> {
        if self.exchange_count() == observed {
            return None;
        }
        let outcome = last.as_ref()?;
        debug!("Adopting concurrent exchange outcome");
        Some(outcome.clone().map_err(ChatError::Auth))
    }

    async fn exchange(
        &self,
        last: &mut Option<Result<AuthToken, String>>,
    ) -> Result<AuthToken, ChatError> {
        self.state.send_replace(AuthState::Loading);

        let outcome = match self.issuer.issue_token().await {
            Ok(token) => {
                if let Err(e) = self.store.save(&token) {
                    warn!(error = %e, "Failed to persist token");
                }
                info!(token = %token.masked(), expires_at = token.expires_at, "Authenticated");
                self.state.send_replace(AuthState::Authorized(token.clone()));
                Ok(token)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Token exchange failed");
                self.state.send_replace(AuthState::Error(message.clone()));
                Err(message)
            }
        };

        *last = Some(outcome.clone());
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        outcome.map_err(ChatError::Auth)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("state", &self.state.borrow().label())
            .field("exchanges", &self.exchange_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIssuer;
    use confab_core::MemoryTokenStore;
    use std::time::Duration;

    fn manager(issuer: &Arc<FakeIssuer>, store: Arc<MemoryTokenStore>) -> Arc<TokenManager> {
        Arc::new(TokenManager::new(issuer.clone(), store))
    }

    #[tokio::test]
    async fn test_fresh_stored_token_skips_network() {
        let issuer = Arc::new(FakeIssuer::succeeding());
        let stored = AuthToken::new("stored", Utc::now().timestamp() + 3600);
        let tokens = manager(&issuer, Arc::new(MemoryTokenStore::with_token(stored)));

        assert!(tokens.state().is_authorized());
        let token = tokens.get_valid_token().await.unwrap();
        assert_eq!(token.access_token, "stored");
        assert_eq!(issuer.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_stored_token_ignored() {
        let issuer = Arc::new(FakeIssuer::succeeding());
        let stored = AuthToken::new("old", Utc::now().timestamp() - 10);
        let tokens = manager(&issuer, Arc::new(MemoryTokenStore::with_token(stored)));
        assert_eq!(tokens.state(), AuthState::Unauthorized);
    }

    #[tokio::test]
    async fn test_token_within_margin_is_refreshed() {
        let issuer = Arc::new(FakeIssuer::succeeding());
        let stored = AuthToken::new("stale", Utc::now().timestamp() + 30);
        let store = Arc::new(MemoryTokenStore::with_token(stored));
        let tokens = manager(&issuer, store.clone());

        let token = tokens.get_valid_token().await.unwrap();
        assert_eq!(token.access_token, "token-1");
        assert_eq!(issuer.calls(), 1);
        assert_eq!(store.load().unwrap().map(|t| t.access_token), Some("token-1".into()));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let issuer = Arc::new(FakeIssuer::succeeding().with_delay(Duration::from_millis(50)));
        let tokens = manager(&issuer, Arc::new(MemoryTokenStore::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tokens = tokens.clone();
                tokio::spawn(async move { tokens.get_valid_token().await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(issuer.calls(), 1);
        assert!(results.iter().all(|t| t.access_token == "token-1"));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_failure() {
        let issuer = Arc::new(FakeIssuer::failing().with_delay(Duration::from_millis(50)));
        let tokens = manager(&issuer, Arc::new(MemoryTokenStore::new()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let tokens = tokens.clone();
                tokio::spawn(async move { tokens.get_valid_token().await })
            })
            .collect();

        let mut errors = Vec::new();
        for handle in handles {
            errors.push(handle.await.unwrap().unwrap_err());
        }

        assert_eq!(issuer.calls(), 1);
        assert!(errors.iter().all(|e| *e == errors[0]));
        assert!(matches!(tokens.state(), AuthState::Error(_)));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_exchange() {
        let issuer = Arc::new(FakeIssuer::succeeding().with_delay(Duration::from_millis(50)));
        let tokens = manager(&issuer, Arc::new(MemoryTokenStore::new()));

        let a = tokens.clone();
        let b = tokens.clone();
        let (first, second) = tokio::join!(a.refresh_token(), b.refresh_token());

        assert_eq!(issuer.calls(), 1);
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn test_failure_then_retry_exchanges_again() {
        let issuer = Arc::new(FakeIssuer::failing());
        let tokens = manager(&issuer, Arc::new(MemoryTokenStore::new()));

        assert!(tokens.authenticate().await.is_err());
        assert!(tokens.authenticate().await.is_err());
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn test_state_transitions_are_published() {
        let issuer = Arc::new(FakeIssuer::succeeding());
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = manager(&issuer, store.clone());
        let mut rx = tokens.subscribe();

        tokens.authenticate().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authorized());

        tokens.logout().await;
        assert_eq!(tokens.state(), AuthState::Unauthorized);
        assert!(store.load().unwrap().is_none());
    }
}
