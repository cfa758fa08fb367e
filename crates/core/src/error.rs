//! Error types shared by the auth storage layers

use thiserror::Error;

/// Standard result type for core operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised while reading or writing persisted auth state
#[derive(Debug, Error)]
pub enum AuthError {
    /// No persistent storage is reachable in this execution context
    #[error("Storage unavailable")]
    StorageUnavailable,

    /// A storage backend rejected the operation
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AuthError {
    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
