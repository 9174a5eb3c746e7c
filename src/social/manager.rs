//! High-level social API.
//!
//! [`SocialManager`] ties [`SocialStorage`] to the feed service and the
//! mention policy: it stamps writes with the current time, works out who a
//! new message should notify, and builds feed pages under one read lock.

use std::path::Path;

use chrono::Utc;

use super::error::{Result, SocialError};
use super::storage::{SocialStorage, StoreReader};
use super::types::{AccountStatus, Message, MessageId, NewUser, Privacy, User, UserId, Viewer};
use crate::feed::{
    self, feed_page, mention, FeedError, FeedKind, FeedPage, FeedRequest, FeedSettings,
    RelationshipGraph,
};

/// Result of posting or editing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    /// The stored message.
    pub message: Message,
    /// Mentioned users who may see the message and should be notified,
    /// sorted by username.
    pub notify: Vec<User>,
}

/// High-level API for users, follows, messages and feeds.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use coriplus_core::feed::FeedSettings;
/// use coriplus_core::social::SocialManager;
///
/// let manager = SocialManager::new(Path::new("/data/coriplus"), FeedSettings::default())?;
/// let alice = manager.register(&NewUser::new("alice"))?;
/// ```
pub struct SocialManager {
    storage: SocialStorage,
    settings: FeedSettings,
}

impl SocialManager {
    /// Creates a new social manager.
    ///
    /// Opens (or creates) `social.db` under `data_dir`.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Base directory for all data
    /// * `settings` - Feed settings; validated here
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or initialization fails.
    pub fn new(data_dir: &Path, settings: FeedSettings) -> Result<Self> {
        settings.validate()?;

        std::fs::create_dir_all(data_dir)
            .map_err(|e| SocialError::Storage(format!("Failed to create data directory: {e}")))?;

        let storage = SocialStorage::new(&data_dir.join("social.db"))?;
        Ok(Self { storage, settings })
    }

    /// Creates a manager backed by an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the database cannot be
    /// initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory(settings: FeedSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            storage: SocialStorage::in_memory()?,
            settings,
        })
    }

    /// Returns the underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &SocialStorage {
        &self.storage
    }

    /// Returns the feed settings.
    #[must_use]
    pub const fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    // ==================== Users ====================

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is invalid or taken.
    pub fn register(&self, new_user: &NewUser) -> Result<User> {
        self.storage.create_user(new_user, Utc::now())
    }

    /// Looks up a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user(&self, username: &str) -> Result<Option<User>> {
        self.storage.get_user_by_username(username)
    }

    /// Changes a user's account state.
    ///
    /// # Errors
    ///
    /// Returns an error if the user doesn't exist.
    pub fn set_account_status(&self, user: UserId, status: AccountStatus) -> Result<()> {
        self.storage.set_account_status(user, status)?;
        tracing::info!(%user, ?status, "changed account status");
        Ok(())
    }

    // ==================== Follow Graph ====================

    /// Makes `from` follow `to`.
    ///
    /// Returns `true` when a new edge was created; that is when `to` should
    /// get a follow notification. Following someone already followed is a
    /// no-op that returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if either user doesn't exist.
    pub fn follow(&self, from: UserId, to: UserId) -> Result<bool> {
        self.storage.follow(from, to, Utc::now())
    }

    /// Makes `from` stop following `to`.
    ///
    /// Returns `true` when an edge was removed; that is when a pending
    /// follow notification for `to` should be withdrawn.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn unfollow(&self, from: UserId, to: UserId) -> Result<bool> {
        self.storage.unfollow(from, to)
    }

    /// Users who follow `user`, sorted by username.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if the user doesn't exist.
    pub fn followers(&self, user: UserId) -> Result<Vec<User>> {
        let reader = self.existing_user_reader(user)?;
        Ok(reader.followers(user)?)
    }

    /// Users `user` follows, sorted by username.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if the user doesn't exist.
    pub fn following(&self, user: UserId) -> Result<Vec<User>> {
        let reader = self.existing_user_reader(user)?;
        Ok(reader.following(user)?)
    }

    fn existing_user_reader(&self, user: UserId) -> Result<StoreReader<'_>> {
        let reader = self.storage.reader()?;
        if reader.user(user)?.is_none() {
            return Err(SocialError::NotFound(user.to_string()));
        }
        Ok(reader)
    }

    // ==================== Messages ====================

    /// Posts a message and works out who it mentions.
    ///
    /// The insert and the mention lookup run in one transaction: when this
    /// returns an error, the message was not stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the author doesn't exist or storage fails.
    pub fn post(&self, author: UserId, text: &str, privacy: Privacy) -> Result<PostOutcome> {
        let (message, notify) =
            self.storage
                .post_message_with(author, text, privacy, Utc::now(), mentioned_audience)?;
        Ok(PostOutcome { message, notify })
    }

    /// Edits a message and works out who it mentions now.
    ///
    /// The edited message moves to the current time. As with [`Self::post`],
    /// an error means the message is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if the message doesn't exist or
    /// [`SocialError::Forbidden`] if `editor` is not its author.
    pub fn edit(
        &self,
        editor: UserId,
        id: MessageId,
        text: &str,
        privacy: Privacy,
    ) -> Result<PostOutcome> {
        let (message, notify) = self.storage.edit_message_with(
            editor,
            id,
            text,
            privacy,
            Utc::now(),
            mentioned_audience,
        )?;
        Ok(PostOutcome { message, notify })
    }

    // ==================== Feeds ====================

    /// Builds one page of a feed.
    ///
    /// # Errors
    ///
    /// See [`feed_page`].
    pub fn feed(&self, request: &FeedRequest) -> feed::Result<FeedPage> {
        let reader = self.storage.reader()?;
        feed_page(&reader, &self.settings, request)
    }

    /// Builds one page of a user's profile feed, addressed by username.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if no user has this username, or any
    /// error of [`feed_page`].
    pub fn profile_feed(&self, username: &str, viewer: Viewer, page: i64) -> feed::Result<FeedPage> {
        let reader = self.storage.reader()?;
        let author = reader
            .user_by_username(username)?
            .ok_or_else(|| FeedError::NotFound(username.to_string()))?;
        let request = FeedRequest::new(FeedKind::Profile(author.id), viewer).with_page(page);
        feed_page(&reader, &self.settings, &request)
    }
}

/// Mentioned users who should be notified about `message`, sorted by username.
fn mentioned_audience(reader: &StoreReader<'_>, message: &Message) -> Result<Vec<User>> {
    let mut notify = Vec::new();
    for username in mention::extract_mentions(&message.text) {
        let Some(user) = reader.user_by_username(&username)? else {
            tracing::debug!(%username, "skipping mention of unknown user");
            continue;
        };
        if mention::should_notify(message, user.id, reader)? {
            notify.push(user);
        }
    }
    if !notify.is_empty() {
        tracing::debug!(message = %message.id, count = notify.len(), "mentions to notify");
    }
    Ok(notify)
}
