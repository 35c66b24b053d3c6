//! Google sign-in for Dayline.
//!
//! [`IdentityProvider`] is the seam the session manager talks to;
//! [`GoogleAuth`] implements it with an OAuth2 browser flow and a token file.

pub mod google;
pub mod identity;
pub mod oauth;
pub mod storage;

pub use google::{GoogleAuth, CALENDAR_READONLY_SCOPE};
pub use identity::{AccessToken, IdentityError, IdentityProvider};
pub use oauth::OAuth2Config;
pub use storage::{TokenSet, TokenStorage};
