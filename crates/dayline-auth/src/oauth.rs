use anyhow::{Context, Result};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use warp::Filter;

use crate::storage::TokenSet;

/// OAuth2 configuration
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Client ID from OAuth provider
    pub client_id: String,

    /// Client secret from OAuth provider
    pub client_secret: String,

    /// Authorization endpoint URL
    pub auth_url: String,

    /// Token endpoint URL
    pub token_url: String,

    /// Redirect URI for OAuth callback
    pub redirect_uri: String,

    /// Scopes to request
    pub scopes: Vec<String>,
}

/// An authorization request waiting for the user to come back through the redirect.
pub struct PendingAuthorization {
    pub url: String,
    pub csrf_token: CsrfToken,
    pub pkce_verifier: PkceCodeVerifier,
}

impl OAuth2Config {
    fn client(&self) -> Result<BasicClient> {
        Ok(BasicClient::new(
            ClientId::new(self.client_id.clone()),
            Some(ClientSecret::new(self.client_secret.clone())),
            AuthUrl::new(self.auth_url.clone()).context("Invalid auth URL")?,
            Some(TokenUrl::new(self.token_url.clone()).context("Invalid token URL")?),
        )
        .set_redirect_uri(
            RedirectUrl::new(self.redirect_uri.clone()).context("Invalid redirect URI")?,
        ))
    }

    /// Build the authorization URL to open in the browser.
    ///
    /// Requests offline access so the token can be refreshed without prompting.
    pub fn authorize(&self) -> Result<PendingAuthorization> {
        let client = self.client()?;
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok(PendingAuthorization {
            url: auth_url.to_string(),
            csrf_token,
            pkce_verifier,
        })
    }

    /// Complete the flow with the authorization code from the callback
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<TokenSet> {
        let token = self
            .client()?
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .context("Failed to exchange authorization code")?;

        Ok(token_set_from(&token, None))
    }

    /// Trade a refresh token for a new access token.
    ///
    /// Google usually omits the refresh token on refresh, so the old one is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let token = self
            .client()?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .context("Failed to refresh access token")?;

        Ok(token_set_from(&token, Some(refresh_token.to_string())))
    }
}

fn token_set_from(token: &BasicTokenResponse, previous_refresh: Option<String>) -> TokenSet {
    let expires_in = token
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(3600);

    TokenSet {
        access_token: token.access_token().secret().clone(),
        refresh_token: token
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh),
        expires_at: chrono::Utc::now().timestamp() + expires_in,
        scopes: token
            .scopes()
            .map(|s| s.iter().map(|scope| scope.to_string()).collect())
            .unwrap_or_default(),
    }
}

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Local HTTP listener for the OAuth redirect, shut down once a callback arrives.
pub struct CallbackServer {
    params: oneshot::Receiver<CallbackParams>,
    shutdown: oneshot::Sender<()>,
}

impl CallbackServer {
    /// Start listening on `127.0.0.1:port` at `/callback`
    pub fn bind(port: u16) -> Result<Self> {
        let (tx, rx) = oneshot::channel();
        let tx: CallbackSender = Arc::new(Mutex::new(Some(tx)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let routes = warp::get()
            .and(warp::path("callback"))
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::any().map(move || tx.clone()))
            .and_then(handle_callback);

        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], port), async {
                let _ = shutdown_rx.await;
            })
            .with_context(|| format!("Failed to bind OAuth callback port {}", port))?;

        tracing::debug!("OAuth callback listening on {}", addr);
        tokio::spawn(server);

        Ok(Self {
            params: rx,
            shutdown: shutdown_tx,
        })
    }

    /// Wait for the browser to hit the redirect URI
    pub async fn wait(self, timeout: Duration) -> Result<CallbackParams> {
        let result = tokio::time::timeout(timeout, self.params).await;
        let _ = self.shutdown.send(());

        result
            .context("Timed out waiting for OAuth callback")?
            .context("OAuth callback server stopped before a callback arrived")
    }
}

async fn handle_callback(
    params: HashMap<String, String>,
    tx: CallbackSender,
) -> Result<impl warp::Reply, warp::Rejection> {
    let callback = CallbackParams {
        code: params.get("code").cloned(),
        state: params.get("state").cloned(),
        error: params.get("error").cloned(),
    };

    if let Some(sender) = tx.lock().await.take() {
        let _ = sender.send(callback);
    }

    Ok(warp::reply::html(
        "<html><body><h1>Signed in to Dayline</h1><p>You can close this window.</p></body></html>",
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn test_config(token_url: &str) -> OAuth2Config {
        OAuth2Config {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            auth_url: "https://accounts.example.com/auth".to_string(),
            token_url: token_url.to_string(),
            redirect_uri: "http://localhost:8085/callback".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
        }
    }

    #[test]
    fn test_authorize_url_has_pkce_and_offline_access() {
        let pending = test_config("https://accounts.example.com/token")
            .authorize()
            .unwrap();

        assert!(pending.url.starts_with("https://accounts.example.com/auth?"));
        assert!(pending.url.contains("code_challenge="));
        assert!(pending.url.contains("access_type=offline"));
        assert!(pending.url.contains("calendar.readonly"));
        assert!(pending.url.contains(pending.csrf_token.secret().as_str()));
    }

    #[test]
    fn test_csrf_state_is_unique() {
        let config = test_config("https://accounts.example.com/token");
        let first = config.authorize().unwrap();
        let second = config.authorize().unwrap();
        assert_ne!(first.csrf_token.secret(), second.csrf_token.secret());
    }

    #[test]
    fn test_invalid_auth_url_is_rejected() {
        let mut config = test_config("https://accounts.example.com/token");
        config.auth_url = "not a url".to_string();
        assert!(config.authorize().is_err());
    }

    #[tokio::test]
    async fn test_refresh_keeps_previous_refresh_token() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .mount(&mock_server)
            .await;

        let config = test_config(&format!("{}/token", mock_server.uri()));
        let token = config.refresh("old-refresh").await.unwrap();

        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert!(!token.is_expired());
    }
}
