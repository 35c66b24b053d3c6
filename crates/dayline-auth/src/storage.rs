use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::identity::AccessToken;

/// Token set for OAuth2 authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token for API requests
    pub access_token: String,

    /// Optional refresh token for token renewal
    pub refresh_token: Option<String>,

    /// Token expiration timestamp (Unix timestamp)
    pub expires_at: i64,

    /// Scopes granted to this token
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Check if the token needs refresh (within 5 minutes of expiry)
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - 300
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at
    }

    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone())
    }
}

/// File-based storage for OAuth token sets, one JSON file per service.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    dir: PathBuf,
}

impl TokenStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn token_path(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{}.json", service))
    }

    /// Store a token set for `service` (e.g. "google")
    pub fn store_token(&self, service: &str, token_set: &TokenSet) -> Result<()> {
        fs::create_dir_all(&self.dir).context("Failed to create tokens directory")?;

        let path = self.token_path(service);
        let json =
            serde_json::to_string_pretty(token_set).context("Failed to serialize token set")?;

        fs::write(&path, &json).context("Failed to write token file")?;

        tracing::info!("Stored token for service: {} at {:?}", service, path);
        Ok(())
    }

    /// Retrieve the token set for `service`, or `None` if nothing is stored
    pub fn retrieve_token(&self, service: &str) -> Result<Option<TokenSet>> {
        let path = self.token_path(service);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).context("Failed to read token file")?;

        let token_set: TokenSet =
            serde_json::from_str(&json).context("Failed to deserialize token set")?;

        tracing::debug!("Retrieved token for service: {}", service);
        Ok(Some(token_set))
    }

    pub fn delete_token(&self, service: &str) -> Result<()> {
        let path = self.token_path(service);

        if path.exists() {
            fs::remove_file(&path).context("Failed to delete token file")?;
            tracing::info!("Deleted token for service: {}", service);
        }

        Ok(())
    }
}
