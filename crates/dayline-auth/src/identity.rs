//! Identity collaborator seam: token acquisition and revocation.

use std::fmt;

use thiserror::Error;

/// Opaque bearer credential for Calendar API requests.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Error, Debug)]
pub enum IdentityError {
    /// Expected at startup when no session exists; not worth more than a log line.
    #[error("User is not signed in")]
    NotSignedIn,

    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("Token revocation failed: {0}")]
    Revocation(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Source of access tokens for the signed-in user.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// Get a token. With `interactive == false` this must never prompt the user.
    async fn get_token(&self, interactive: bool) -> Result<AccessToken, IdentityError>;

    /// Revoke `token` with the identity provider and forget it locally.
    async fn revoke_token(&self, token: &AccessToken) -> Result<(), IdentityError>;
}
