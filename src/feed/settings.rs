//! Feed configuration.

use serde::{Deserialize, Serialize};

use super::error::{FeedError, Result};

/// Number of messages on a feed page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Settings shared by every feed.
///
/// Missing fields fall back to their defaults when loaded from JSON.
///
/// # Example
///
/// ```
/// use coriplus_core::feed::FeedSettings;
///
/// let settings = FeedSettings::from_json(r#"{"page_size": 50}"#).unwrap();
/// assert_eq!(settings.page_size, 50);
/// assert_eq!(FeedSettings::from_json("{}").unwrap(), FeedSettings::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Messages per page (must be positive).
    pub page_size: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FeedSettings {
    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Parses and validates settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidSettings`] if the JSON is malformed or the
    /// settings are not usable.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| FeedError::InvalidSettings(format!("Invalid settings JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidSettings`] if `page_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(FeedError::InvalidSettings(
                "page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
