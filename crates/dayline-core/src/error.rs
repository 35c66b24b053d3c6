//! Centralized error types for Dayline.
//!
//! Crate-level errors (calendar client, identity, session pipeline) map into
//! [`AppError`], which carries a user-facing message for every variant.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message suitable for display.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// A pipeline run was already in progress.
    #[error("Busy: {0}")]
    Busy(String),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
            AppError::Aggregation(e) => e.user_message(),
            AppError::Busy(_) => "Events are already loading. Please wait.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "Google Calendar is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { status, .. } if *status == 429 => {
                "Too many requests. Please wait and refresh."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Local key-value storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ReadFailed(_) => "Unable to read saved events. Try refreshing.",
            StorageError::WriteFailed(_) => "Unable to save events locally.",
            StorageError::Corrupt(_) => "Saved events were unreadable and have been discarded.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Authentication errors (OAuth, tokens, credentials).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Token expired")]
    TokenExpired,

    #[error("Access denied")]
    AccessDenied,

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("Token storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NotSignedIn => "Not signed in. Please sign in with Google.",
            AuthError::TokenExpired => "Your session has expired. Please sign in again.",
            AuthError::AccessDenied => "Calendar access was denied. Please sign in again.",
            AuthError::OAuthFailed(_) => "Sign-in failed. Please try again.",
            AuthError::StorageError(_) => "Failed to save credentials. Please try again.",
        }
    }
}

/// One calendar's events could not be fetched, so nothing was rendered.
#[derive(Debug, Error)]
#[error("Failed to fetch events for calendar {calendar_id}: {message}")]
pub struct AggregationError {
    pub calendar_id: String,
    pub message: String,
}

impl AggregationError {
    pub fn user_message(&self) -> &'static str {
        "Some calendars could not be loaded. Showing previous events; try refreshing."
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
