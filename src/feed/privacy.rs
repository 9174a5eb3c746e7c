//! Message visibility decisions.
//!
//! # Decision Table
//!
//! Evaluated top to bottom, first match wins:
//!
//! | # | Condition | Visible |
//! |---|-----------|---------|
//! | 1 | viewer is the author | unless in the explore feed |
//! | 2 | `Public` | always |
//! | 3 | `Unlisted` | unless in the explore feed |
//! | 4 | `Friends` | viewer and author follow each other |
//! | 5 | anything else | never |
//!
//! An anonymous viewer can only ever match rules 2 and 3.

use super::error::Result;
use super::graph::RelationshipGraph;
use crate::social::types::{Message, Privacy, UserId, Viewer};

/// Returns whether `viewer` may see `message` in the given feed context.
///
/// The decision depends only on the message's author and privacy level, the
/// viewer, the follow graph and `is_global_feed`.
///
/// # Errors
///
/// Returns an error if the follow graph cannot be read.
pub fn is_visible<G>(
    message: &Message,
    viewer: Viewer,
    is_global_feed: bool,
    graph: &G,
) -> Result<bool>
where
    G: RelationshipGraph + ?Sized,
{
    if viewer.is(message.author) {
        // Own posts never show up in explore.
        return Ok(!is_global_feed);
    }
    audience_allows(message.privacy, message.author, viewer.id(), is_global_feed, graph)
}

/// Applies rules 2 to 5 of the decision table.
///
/// Shared with the mention policy, which treats the mentioned user as the
/// viewer of a non-global feed.
pub(crate) fn audience_allows<G>(
    privacy: Privacy,
    author: UserId,
    viewer: Option<UserId>,
    is_global_feed: bool,
    graph: &G,
) -> Result<bool>
where
    G: RelationshipGraph + ?Sized,
{
    match privacy {
        Privacy::Public => Ok(true),
        Privacy::Unlisted => Ok(!is_global_feed),
        Privacy::Friends => match viewer {
            Some(viewer) => graph.is_mutual(author, viewer),
            None => Ok(false),
        },
        Privacy::OnlyMe => Ok(false),
    }
}
