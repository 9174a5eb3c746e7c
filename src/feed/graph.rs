//! Follow relationships as seen by the feed.

use super::error::Result;
use crate::social::types::{User, UserId};

/// Directed follow edges between users.
///
/// Implementations answer point lookups against an index; they must never
/// load every edge to decide a single `is_following` question.
pub trait RelationshipGraph {
    /// Returns true iff `from` follows `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn is_following(&self, from: UserId, to: UserId) -> Result<bool>;

    /// Returns every user `user` follows, sorted by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn following(&self, user: UserId) -> Result<Vec<User>>;

    /// Returns every user following `user`, sorted by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn followers(&self, user: UserId) -> Result<Vec<User>>;

    /// Returns true iff `a` and `b` follow each other.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn is_mutual(&self, a: UserId, b: UserId) -> Result<bool> {
        Ok(self.is_following(a, b)? && self.is_following(b, a)?)
    }
}
