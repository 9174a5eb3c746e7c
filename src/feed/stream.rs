//! Candidate streams: which messages a feed considers before filtering.
//!
//! | Feed kind | Candidates | Explore context |
//! |-----------|------------|-----------------|
//! | Home | viewer's own messages and those of everyone the viewer follows | no |
//! | Explore | every message | yes |
//! | Profile | messages by one author | no |
//!
//! Streams are never pre-filtered by privacy; that is the paginator's job.

use super::error::{FeedError, Result};
use super::graph::RelationshipGraph;
use crate::social::types::{Message, UserId, Viewer};

/// The feeds a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// The signed-in viewer's timeline.
    Home,
    /// Every message in the system.
    Explore,
    /// One user's messages.
    Profile(UserId),
}

/// A resolved candidate set, ready to be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateQuery {
    /// Messages by this user or by anyone this user follows.
    Home(UserId),
    /// Every message.
    All,
    /// Messages by this author.
    Author(UserId),
}

impl CandidateQuery {
    /// Resolves a feed request into a candidate query.
    ///
    /// Runs before any message is read: an anonymous home feed and a missing
    /// profile target are both rejected here.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::AnonymousViewer`] for an anonymous home feed,
    /// [`FeedError::NotFound`] when the profile target does not exist, or a
    /// store error if the existence check fails.
    pub fn resolve<S>(kind: FeedKind, viewer: Viewer, source: &S) -> Result<Self>
    where
        S: CandidateSource + ?Sized,
    {
        match kind {
            FeedKind::Home => viewer.id().map(Self::Home).ok_or(FeedError::AnonymousViewer),
            FeedKind::Explore => Ok(Self::All),
            FeedKind::Profile(author) => {
                if source.user_exists(author)? {
                    Ok(Self::Author(author))
                } else {
                    Err(FeedError::NotFound(author.to_string()))
                }
            }
        }
    }

    /// Whether visibility is evaluated in the explore context.
    #[must_use]
    pub const fn is_global_feed(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether `message` belongs to this candidate set.
    ///
    /// Only needed by sources that cannot push the selection down into a
    /// query of their own.
    ///
    /// # Errors
    ///
    /// Returns an error if the follow graph cannot be read.
    pub fn admits<G>(&self, message: &Message, graph: &G) -> Result<bool>
    where
        G: RelationshipGraph + ?Sized,
    {
        match *self {
            Self::Home(viewer) => Ok(message.author == viewer
                || graph.is_following(viewer, message.author)?),
            Self::All => Ok(true),
            Self::Author(author) => Ok(message.author == author),
        }
    }
}

/// The type of iterator a [`CandidateSource`] hands to a walk.
pub type Candidates<'a> = dyn Iterator<Item = Result<Message>> + 'a;

/// Read access to messages in reverse-chronological order.
///
/// Candidates are ordered by timestamp, newest first, with ties broken by
/// message id (higher id first).
pub trait CandidateSource: RelationshipGraph {
    /// Returns whether a user with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn user_exists(&self, user: UserId) -> Result<bool>;

    /// Opens a cursor over the candidates of `query` and hands it to `walk`.
    ///
    /// The cursor lives only for the duration of `walk`, so it is released
    /// however the walk ends, including when it stops early or fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be opened, or whatever error
    /// `walk` returns.
    fn scan<R, F>(&self, query: CandidateQuery, walk: F) -> Result<R>
    where
        F: FnOnce(&mut Candidates<'_>) -> Result<R>;
}
