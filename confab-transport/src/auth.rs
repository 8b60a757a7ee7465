//! Token endpoint client.
//!
//! Exchanges a pre-shared authorization key for a short-lived bearer token.
//! Each request carries a fresh `RqUID` correlation ID.

use async_trait::async_trait;
use confab_core::{AuthToken, mask_secret};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::TransportError;
use crate::http::HttpClient;
use crate::wire::AuthResponse;

/// Default token scope.
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";

/// Token endpoint path under the auth URL.
const OAUTH_PATH: &str = "oauth";

/// Issues bearer tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Performs one credential exchange.
    async fn issue_token(&self) -> Result<AuthToken, TransportError>;
}

/// Client for the `oauth` token endpoint.
pub struct AuthClient {
    http: HttpClient,
    endpoint: String,
    scope: String,
    authorization_key: String,
}

impl AuthClient {
    /// Creates a client for `{auth_url}/oauth`.
    pub fn new(
        http: HttpClient,
        auth_url: &str,
        scope: impl Into<String>,
        authorization_key: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let authorization_key = authorization_key.into();
        if authorization_key.trim().is_empty() {
            return Err(TransportError::Config(
                "authorization key is empty".to_string(),
            ));
        }
        Ok(Self {
            http,
            endpoint: HttpClient::endpoint(auth_url, OAUTH_PATH)?,
            scope: scope.into(),
            authorization_key,
        })
    }

    /// The resolved token endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("endpoint", &self.endpoint)
            .field("scope", &self.scope)
            .field("authorization_key", &mask_secret(&self.authorization_key))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenIssuer for AuthClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint, scope = %self.scope))]
    async fn issue_token(&self) -> Result<AuthToken, TransportError> {
        let rq_uid = Uuid::new_v4().to_string();
        debug!(rq_uid = %rq_uid, "Requesting access token");

        let request = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Basic {}", self.authorization_key))
            .header("RqUID", &rq_uid)
            .header(ACCEPT, "application/json")
            .form(&[("scope", self.scope.as_str())]);

        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Auth(format!("{} - {}", status.as_u16(), body)));
        }

        let body: AuthResponse = response.json().await?;
        let token = AuthToken::from_provider_expiry(body.access_token, body.expires_at);
        info!(expires_at = token.expires_at, "Access token issued");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> AuthClient {
        AuthClient::new(
            HttpClient::new().unwrap(),
            &format!("{}/api/v2", server.uri()),
            DEFAULT_SCOPE,
            "c2VjcmV0",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_issue_token_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/oauth"))
            .and(header("authorization", "Basic c2VjcmV0"))
            .and(header("accept", "application/json"))
            .and(header_exists("rquid"))
            .and(body_string("scope=GIGACHAT_API_PERS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "expires_at": 1_900_000_000_000_i64
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server).await.issue_token().await.unwrap();
        assert_eq!(token.access_token, "tok-1");
        assert_eq!(token.expires_at, 1_900_000_000);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/oauth"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client(&server).await.issue_token().await.unwrap_err();
        assert!(matches!(err, TransportError::Auth(ref msg) if msg == "401 - bad key"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = AuthClient::new(HttpClient::new().unwrap(), "https://auth.example", "s", " ");
        assert!(matches!(result, Err(TransportError::Config(_))));
    }

    #[test]
    fn test_debug_masks_key() {
        let client = AuthClient::new(
            HttpClient::new().unwrap(),
            "https://auth.example/api/v2",
            DEFAULT_SCOPE,
            "very-secret-authorization-key",
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("very-secret-authorization-key"));
        assert_eq!(client.endpoint(), "https://auth.example/api/v2/oauth");
    }
}
