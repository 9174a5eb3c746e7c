//! Error types for feed operations.

use thiserror::Error;

/// Errors that can occur while building a feed page.
///
/// Nothing here is retried or recovered locally: a failed walk never turns
/// into an empty or truncated page.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The profile feed target does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store could not be read.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Page numbers start at 1.
    #[error("Invalid page number: {0}")]
    InvalidPage(i64),

    /// The home feed needs a signed-in viewer.
    #[error("Home feed requires a signed-in viewer")]
    AnonymousViewer,

    /// Feed settings are not usable.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

impl From<rusqlite::Error> for FeedError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<crate::social::SocialError> for FeedError {
    fn from(err: crate::social::SocialError) -> Self {
        match err {
            crate::social::SocialError::NotFound(what) => Self::NotFound(what),
            crate::social::SocialError::InvalidSettings(reason) => Self::InvalidSettings(reason),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}
