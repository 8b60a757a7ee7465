//! Wiring of stores, transport and session from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use confab_core::{AuthToken, ConversationStore, SettingsSource, TokenStore};
use confab_session::{ChatSession, TokenManager};
use confab_store::{
    AppConfig, AuthKeySource, JsonConversationStore, SettingsStore, TranscriptStore,
    open_token_store, resolve_auth_key,
};
use confab_transport::{
    AuthClient, ChatTransport, HttpChatTransport, HttpClient, Timeouts, TokenIssuer,
    TransportError,
};
use tracing::debug;

/// Issuer used when no authorization key is configured.
///
/// Every exchange fails with a hint on how to provide a key, so commands
/// that never need a fresh token (status, logout) still work.
struct MissingKeyIssuer;

#[async_trait]
impl TokenIssuer for MissingKeyIssuer {
    async fn issue_token(&self) -> Result<AuthToken, TransportError> {
        Err(TransportError::Config(
            "no authorization key: set CONFAB_AUTH_KEY or run `confab login --key <KEY>`".into(),
        ))
    }
}

/// Everything a command needs, built once per process.
pub struct App {
    pub config: AppConfig,
    pub settings: Arc<SettingsStore>,
    pub tokens: Arc<TokenManager>,
    pub transport: Arc<dyn ChatTransport>,
    pub history: Arc<JsonConversationStore>,
    pub transcripts: TranscriptStore,
    pub key_source: Option<AuthKeySource>,
}

impl App {
    /// Loads configuration and opens every store.
    pub async fn load() -> Result<Self> {
        let config = AppConfig::load().context("failed to load configuration")?;
        let http = HttpClient::with_timeouts(Timeouts {
            connect: config.connect_timeout(),
            request: config.request_timeout(),
            stream_idle: config.stream_idle_timeout(),
        })?;

        let resolved = resolve_auth_key().context("failed to read the authorization key")?;
        let key_source = resolved.as_ref().map(|(_, source)| *source);
        let issuer: Arc<dyn TokenIssuer> = match resolved {
            Some((key, source)) => {
                debug!(?source, "Authorization key resolved");
                Arc::new(AuthClient::new(http.clone(), &config.auth_url, config.scope.clone(), key)?)
            }
            None => Arc::new(MissingKeyIssuer),
        };

        let token_store: Arc<dyn TokenStore> = Arc::from(open_token_store(config.token_backend));
        let tokens = Arc::new(TokenManager::new(issuer, token_store));
        let transport: Arc<dyn ChatTransport> =
            Arc::new(HttpChatTransport::new(http, &config.api_url)?);

        let settings = Arc::new(SettingsStore::load_default().await?);
        let history = Arc::new(
            JsonConversationStore::open_default()
                .await
                .context("failed to open conversation history")?,
        );

        Ok(Self {
            config,
            settings,
            tokens,
            transport,
            history,
            transcripts: TranscriptStore::default_location(),
            key_source,
        })
    }

    /// Builds a chat session over the persistent history.
    pub fn session(&self) -> ChatSession {
        self.session_with_store(self.history.clone())
    }

    /// Builds a chat session over another conversation store.
    pub fn session_with_store(&self, store: Arc<dyn ConversationStore>) -> ChatSession {
        let settings: Arc<dyn SettingsSource> = self.settings.clone();
        ChatSession::new(self.tokens.clone(), self.transport.clone(), settings, store)
    }
}
