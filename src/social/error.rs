//! Error types for social storage operations.
//!
//! This module defines errors that can occur while reading or writing
//! users, follow edges and messages.

use thiserror::Error;

/// Error type for social storage operations.
#[derive(Error, Debug)]
pub enum SocialError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// User or message not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Username is already taken.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Username does not follow the username rules.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid data found in storage.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Caller is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Feed settings are not usable.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type alias for social storage operations.
pub type Result<T> = std::result::Result<T, SocialError>;

impl From<crate::feed::FeedError> for SocialError {
    fn from(err: crate::feed::FeedError) -> Self {
        match err {
            crate::feed::FeedError::NotFound(what) => Self::NotFound(what),
            crate::feed::FeedError::InvalidSettings(reason) => Self::InvalidSettings(reason),
            other => Self::Storage(other.to_string()),
        }
    }
}
