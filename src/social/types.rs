//! Core types for the social graph.
//!
//! This module defines the data structures for users, follow edges and
//! messages, plus the message privacy levels the feed policy is built on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final username segments that are rejected so a username never reads
/// like a domain name or a file name.
const FORBIDDEN_EXTENSIONS: &[&str] = &["com", "net", "org", "txt"];

/// Opaque unique identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

/// Opaque unique identifier of a message.
///
/// Identifiers grow with insertion order, which makes them the tie-breaker
/// for messages sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "message#{}", self.0)
    }
}

/// Who is looking at a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    /// Unauthenticated visitor.
    #[default]
    Anonymous,
    /// A signed-in user.
    User(UserId),
}

impl Viewer {
    /// Returns the viewer's identity, if any.
    #[must_use]
    pub const fn id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(*id),
        }
    }

    /// Returns true if this viewer is the given user.
    #[must_use]
    pub fn is(&self, user: UserId) -> bool {
        self.id() == Some(user)
    }
}

impl From<Option<UserId>> for Viewer {
    fn from(id: Option<UserId>) -> Self {
        id.map_or(Self::Anonymous, Self::User)
    }
}

/// Privacy level of a message.
///
/// # Audience Table
///
/// | Privacy  | Code | Audience |
/// |----------|------|----------|
/// | Public   | 0    | everyone, every feed |
/// | Unlisted | 1    | everyone, except the explore feed |
/// | Friends  | 2    | users who mutually follow the author |
/// | OnlyMe   | 3    | the author only |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    /// Visible to everyone.
    #[default]
    Public,
    /// Visible to everyone who reaches it directly; hidden from explore.
    Unlisted,
    /// Visible to mutual followers of the author.
    Friends,
    /// Visible to the author only.
    OnlyMe,
}

impl Privacy {
    /// Converts to the integer code used in storage.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Public => 0,
            Self::Unlisted => 1,
            Self::Friends => 2,
            Self::OnlyMe => 3,
        }
    }

    /// Parses a storage code, returning `None` for unknown codes.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Public),
            1 => Some(Self::Unlisted),
            2 => Some(Self::Friends),
            3 => Some(Self::OnlyMe),
            _ => None,
        }
    }

    /// Parses a storage code, falling back to the most restrictive level.
    #[must_use]
    pub fn from_code_or_deny(code: i64) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            tracing::warn!(code, "unknown privacy code, treating message as only-me");
            Self::OnlyMe
        })
    }
}

/// Account state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Normal account.
    #[default]
    Active,
    /// Disabled by its owner.
    DisabledByUser,
    /// Banned by an administrator.
    Banned,
}

impl AccountStatus {
    /// Converts to the integer code used in storage.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::DisabledByUser => 1,
            Self::Banned => 2,
        }
    }

    /// Parses a storage code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Active),
            1 => Some(Self::DisabledByUser),
            2 => Some(Self::Banned),
            _ => None,
        }
    }

    /// Returns whether the account is usable.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Returns whether `username` is an acceptable username.
///
/// A username is a sequence of `.`-separated segments made of ASCII
/// letters, digits and `_`. Empty segments are rejected, and so is a final
/// segment such as `com` or `txt`.
///
/// # Examples
///
/// ```
/// use coriplus_core::social::types::is_valid_username;
///
/// assert!(is_valid_username("jane_doe"));
/// assert!(is_valid_username("jane.doe"));
/// assert!(!is_valid_username("jane.com"));
/// assert!(!is_valid_username("jane..doe"));
/// ```
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    let mut segments = username.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segment.is_empty()
            || !segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return false;
        }
        if segments.peek().is_none() && FORBIDDEN_EXTENSIONS.contains(&segment) {
            return false;
        }
    }
    true
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Unique username.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// When the user registered.
    pub join_date: DateTime<Utc>,
    /// Account state.
    pub status: AccountStatus,
}

/// Data needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Requested username.
    pub username: String,
    /// Display name.
    pub full_name: String,
}

impl NewUser {
    /// Creates a registration request whose display name is the username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            full_name: username.clone(),
            username,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }
}

/// A posted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// The user who posted the message.
    pub author: UserId,
    /// Message text.
    pub text: String,
    /// When the message was posted (or last edited).
    pub published_at: DateTime<Utc>,
    /// Who may see the message.
    pub privacy: Privacy,
}

impl Message {
    /// Returns true if `user` wrote this message.
    #[must_use]
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author == user
    }
}
