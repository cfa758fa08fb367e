//! Client error types

use thiserror::Error;

/// Why a token refresh did not produce a new access token
///
/// Cloned to every request queued behind the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Nothing to refresh with; the user must sign in again
    #[error("No refresh token stored")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status
    #[error("Refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh request never got a response
    #[error("Refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint answered 2xx with an unusable body
    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The refreshing request was dropped before the refresh settled
    #[error("Refresh aborted")]
    Aborted,
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Authentication failed and the session could not be refreshed
    #[error("Session expired: {message}")]
    SessionExpired {
        message: String,
        #[source]
        reason: RefreshError,
    },

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The server issued tokens the client refused to store
    #[error("Invalid auth payload: {0}")]
    InvalidAuthPayload(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// True when the caller should send the user back to sign in
    pub const fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::SessionExpired { .. }
        )
    }

    /// The refresh failure behind this error, if any
    pub const fn refresh_error(&self) -> Option<&RefreshError> {
        match self {
            Self::SessionExpired { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
