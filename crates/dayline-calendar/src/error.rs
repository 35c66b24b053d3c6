//! Calendar-specific error types.

use dayline_auth::IdentityError;
use dayline_core::{
    AggregationError, AppError, AuthError, NetworkError, ReqwestErrorExt, StorageError,
};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Access denied")]
    AccessDenied,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// One calendar's events failed, so the whole day was abandoned.
    #[error("Failed to fetch events for calendar {calendar_id}: {source}")]
    Aggregation {
        calendar_id: String,
        #[source]
        source: Box<CalendarError>,
    },
}

impl CalendarError {
    /// Missing, expired or denied token. Looks through aggregation failures.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::TokenExpired | Self::AccessDenied => true,
            Self::Aggregation { source, .. } => source.is_auth(),
            _ => false,
        }
    }

    /// Transport failures and 5xx responses.
    pub fn is_network(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::Server { .. } => true,
            Self::Aggregation { source, .. } => source.is_network(),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("A load is already in progress")]
    Busy,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<CalendarError> for AppError {
    fn from(e: CalendarError) -> Self {
        match e {
            CalendarError::TokenExpired => AppError::Auth(AuthError::TokenExpired),
            CalendarError::AccessDenied => AppError::Auth(AuthError::AccessDenied),
            CalendarError::RateLimited(secs) => AppError::Network(NetworkError::ServerError {
                status: 429,
                message: format!("retry after {} seconds", secs),
            }),
            CalendarError::Server { status, message }
            | CalendarError::ApiError { status, message } => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            CalendarError::InvalidResponse(msg) => {
                AppError::Network(NetworkError::InvalidResponse(msg))
            }
            CalendarError::NetworkError(e) => AppError::Network(e.into_network_error()),
            CalendarError::Aggregation { calendar_id, source } if source.is_auth() => {
                tracing::debug!("Aggregation for {} failed on auth", calendar_id);
                AppError::from(*source)
            }
            CalendarError::Aggregation {
                calendar_id,
                source,
            } => AppError::Aggregation(AggregationError {
                calendar_id,
                message: source.to_string(),
            }),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotSignedIn => AppError::Auth(AuthError::NotSignedIn),
            SessionError::Busy => AppError::Busy("pipeline already running".into()),
            SessionError::Identity(IdentityError::NotSignedIn) => {
                AppError::Auth(AuthError::NotSignedIn)
            }
            SessionError::Identity(IdentityError::Storage(msg)) => {
                AppError::Auth(AuthError::StorageError(msg))
            }
            SessionError::Identity(other) => {
                AppError::Auth(AuthError::OAuthFailed(other.to_string()))
            }
            SessionError::Calendar(e) => AppError::from(e),
            SessionError::Storage(e) => AppError::from(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Read(msg) => AppError::Storage(StorageError::ReadFailed(msg)),
            StoreError::Write(msg) => AppError::Storage(StorageError::WriteFailed(msg)),
            StoreError::Corrupt(msg) => AppError::Storage(StorageError::Corrupt(msg)),
        }
    }
}
