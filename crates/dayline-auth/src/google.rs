//! Google OAuth2 identity provider for Calendar access.

use std::time::Duration;

use crate::identity::{AccessToken, IdentityError, IdentityProvider};
use crate::oauth::{CallbackServer, OAuth2Config};
use crate::storage::{TokenSet, TokenStorage};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

const SERVICE_ID: &str = "google";
const SIGN_IN_TIMEOUT: Duration = Duration::from_secs(300);

pub struct GoogleAuth {
    oauth: OAuth2Config,
    storage: TokenStorage,
    revoke_url: String,
    callback_port: u16,
    http: reqwest::Client,
}

impl GoogleAuth {
    pub fn new(
        client_id: String,
        client_secret: String,
        callback_port: u16,
        revoke_url: String,
        storage: TokenStorage,
    ) -> Self {
        Self {
            oauth: OAuth2Config {
                client_id,
                client_secret,
                auth_url: GOOGLE_AUTH_URL.to_string(),
                token_url: GOOGLE_TOKEN_URL.to_string(),
                redirect_uri: format!("http://localhost:{}/callback", callback_port),
                scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
            },
            storage,
            revoke_url,
            callback_port,
            http: reqwest::Client::new(),
        }
    }

    #[cfg(test)]
    fn with_token_url(mut self, token_url: &str) -> Self {
        self.oauth.token_url = token_url.to_string();
        self
    }

    pub fn oauth_config(&self) -> &OAuth2Config {
        &self.oauth
    }

    fn stored_token(&self) -> Result<Option<TokenSet>, IdentityError> {
        self.storage
            .retrieve_token(SERVICE_ID)
            .map_err(|e| IdentityError::Storage(format!("{:#}", e)))
    }

    fn save_token(&self, token: &TokenSet) -> Result<(), IdentityError> {
        self.storage
            .store_token(SERVICE_ID, token)
            .map_err(|e| IdentityError::Storage(format!("{:#}", e)))
    }

    /// Stored token, refreshed if it is about to expire. Never opens a browser.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn silent_token(&self) -> Result<AccessToken, IdentityError> {
        let token = self.stored_token()?.ok_or(IdentityError::NotSignedIn)?;

        if !token.needs_refresh() {
            return Ok(token.access_token());
        }

        let Some(refresh_token) = token.refresh_token.as_deref() else {
            tracing::info!("Stored Google token expired and has no refresh token");
            return Err(IdentityError::NotSignedIn);
        };

        let refreshed = self
            .oauth
            .refresh(refresh_token)
            .await
            .map_err(|e| IdentityError::TokenRequest(format!("{:#}", e)))?;
        self.save_token(&refreshed)?;

        tracing::info!("Refreshed Google access token");
        Ok(refreshed.access_token())
    }

    /// Full browser flow with a local callback server.
    #[tracing::instrument(skip(self), level = "info")]
    async fn sign_in(&self) -> Result<AccessToken, IdentityError> {
        let pending = self
            .oauth
            .authorize()
            .map_err(|e| IdentityError::TokenRequest(format!("{:#}", e)))?;

        let callback = CallbackServer::bind(self.callback_port)
            .map_err(|e| IdentityError::TokenRequest(format!("{:#}", e)))?;

        tracing::info!("Opening browser for Google sign-in");
        if let Err(e) = webbrowser::open(&pending.url) {
            tracing::warn!("Failed to open browser ({}); visit {}", e, pending.url);
        }

        let params = callback
            .wait(SIGN_IN_TIMEOUT)
            .await
            .map_err(|e| IdentityError::TokenRequest(format!("{:#}", e)))?;

        if let Some(error) = params.error {
            tracing::info!("Google sign-in returned error: {}", error);
            return Err(IdentityError::Cancelled);
        }

        if params.state.as_deref() != Some(pending.csrf_token.secret().as_str()) {
            return Err(IdentityError::TokenRequest("CSRF token mismatch".to_string()));
        }

        let code = params
            .code
            .ok_or_else(|| IdentityError::TokenRequest("Callback had no code".to_string()))?;

        let token = self
            .oauth
            .exchange_code(code, pending.pkce_verifier)
            .await
            .map_err(|e| IdentityError::TokenRequest(format!("{:#}", e)))?;
        self.save_token(&token)?;

        tracing::info!("Google sign-in completed");
        Ok(token.access_token())
    }
}

impl IdentityProvider for GoogleAuth {
    async fn get_token(&self, interactive: bool) -> Result<AccessToken, IdentityError> {
        match self.silent_token().await {
            Ok(token) => Ok(token),
            Err(e) if interactive => {
                tracing::debug!("Silent token unavailable ({}), prompting", e);
                self.sign_in().await
            }
            Err(e) => Err(e),
        }
    }

    /// Forgets the stored token first so local sign-out holds even if the
    /// revoke request fails.
    #[tracing::instrument(skip(self, token), level = "info")]
    async fn revoke_token(&self, token: &AccessToken) -> Result<(), IdentityError> {
        self.storage
            .delete_token(SERVICE_ID)
            .map_err(|e| IdentityError::Storage(format!("{:#}", e)))?;

        let response = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", token.secret())])
            .send()
            .await
            .map_err(|e| IdentityError::Revocation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::Revocation(format!("{}: {}", status, text)));
        }

        Ok(())
    }
}
