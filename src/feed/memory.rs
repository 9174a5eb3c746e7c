//! In-memory feed source for tests.
//!
//! Holds users, follow edges and messages in plain collections and can be
//! told to fail, either on every graph lookup or after a number of
//! candidates have been read.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::error::{FeedError, Result};
use super::graph::RelationshipGraph;
use super::stream::{CandidateQuery, CandidateSource, Candidates};
use crate::social::types::{AccountStatus, Message, MessageId, Privacy, User, UserId};

/// In-memory [`CandidateSource`] with failure injection.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    users: BTreeMap<UserId, User>,
    edges: BTreeSet<(UserId, UserId)>,
    messages: Vec<Message>,
    clock: i64,
    fail_after: Option<usize>,
    fail_graph: bool,
    pulled: Cell<usize>,
}

impl MemoryFeed {
    /// Creates an empty feed source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    pub fn add_user(&mut self, id: UserId, username: &str) {
        self.users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                full_name: username.to_string(),
                join_date: DateTime::<Utc>::default(),
                status: AccountStatus::Active,
            },
        );
    }

    /// Adds the edge `from -> to`. Adding it twice is a no-op.
    pub fn follow(&mut self, from: UserId, to: UserId) {
        self.edges.insert((from, to));
    }

    /// Removes the edge `from -> to`.
    pub fn unfollow(&mut self, from: UserId, to: UserId) {
        self.edges.remove(&(from, to));
    }

    /// Posts a message one second after the previous one.
    pub fn post(&mut self, author: UserId, privacy: Privacy) -> MessageId {
        let at = self.clock + 1;
        self.post_at(author, privacy, at)
    }

    /// Posts a message at `at` seconds since the epoch.
    ///
    /// # Panics
    ///
    /// Panics if `at` is out of range for a timestamp.
    pub fn post_at(&mut self, author: UserId, privacy: Privacy, at: i64) -> MessageId {
        let id = MessageId(i64::try_from(self.messages.len()).unwrap_or(i64::MAX) + 1);
        self.clock = self.clock.max(at);
        self.messages.push(Message {
            id,
            author,
            text: format!("message {}", id.0),
            published_at: DateTime::from_timestamp(at, 0).expect("timestamp in range"),
            privacy,
        });
        id
    }

    /// Returns a message by id.
    #[must_use]
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Makes every candidate read at or past `index` fail.
    pub fn fail_after(&mut self, index: usize) {
        self.fail_after = Some(index);
    }

    /// Makes every graph lookup fail.
    pub fn fail_graph(&mut self) {
        self.fail_graph = true;
    }

    /// Number of candidates pulled by the most recent scan.
    #[must_use]
    pub fn pulled(&self) -> usize {
        self.pulled.get()
    }

    fn users_where(&self, keep: impl Fn(&(UserId, UserId)) -> Option<UserId>) -> Result<Vec<User>> {
        if self.fail_graph {
            return Err(FeedError::StoreUnavailable("graph offline".to_string()));
        }
        let mut users: Vec<User> = self
            .edges
            .iter()
            .filter_map(keep)
            .filter_map(|id| self.users.get(&id).cloned())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

impl RelationshipGraph for MemoryFeed {
    fn is_following(&self, from: UserId, to: UserId) -> Result<bool> {
        if self.fail_graph {
            return Err(FeedError::StoreUnavailable("graph offline".to_string()));
        }
        Ok(self.edges.contains(&(from, to)))
    }

    fn following(&self, user: UserId) -> Result<Vec<User>> {
        self.users_where(|&(from, to)| (from == user).then_some(to))
    }

    fn followers(&self, user: UserId) -> Result<Vec<User>> {
        self.users_where(|&(from, to)| (to == user).then_some(from))
    }
}

impl CandidateSource for MemoryFeed {
    fn user_exists(&self, user: UserId) -> Result<bool> {
        Ok(self.users.contains_key(&user))
    }

    fn scan<R, F>(&self, query: CandidateQuery, walk: F) -> Result<R>
    where
        F: FnOnce(&mut Candidates<'_>) -> Result<R>,
    {
        let mut candidates = Vec::new();
        for message in &self.messages {
            if query.admits(message, self)? {
                candidates.push(message);
            }
        }
        candidates.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        self.pulled.set(0);
        let fail_after = self.fail_after;
        let pulled = &self.pulled;
        let mut stream = candidates.into_iter().enumerate().map(|(index, message)| {
            pulled.set(index + 1);
            if fail_after.is_some_and(|limit| index >= limit) {
                Err(FeedError::StoreUnavailable(format!(
                    "read failed at candidate {index}"
                )))
            } else {
                Ok(message.clone())
            }
        });
        walk(&mut stream)
    }
}
