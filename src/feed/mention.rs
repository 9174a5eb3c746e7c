//! Mentions in message text.
//!
//! A mention is `+` followed by a username, e.g. `+alice` or `+jane.doe`.
//! Whether a mentioned user gets notified follows the same audience rules as
//! the feeds, with the mentioned user as the viewer.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::error::Result;
use super::graph::RelationshipGraph;
use super::privacy::audience_allows;
use crate::social::types::{Message, UserId};

/// `+` followed by word segments joined by single dots.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)").expect("mention pattern is valid")
});

/// Extracts the distinct usernames mentioned in `text`.
///
/// A mention is a `+` followed by one or more word segments joined by
/// single dots. A trailing dot is not part of the mention.
///
/// # Examples
///
/// ```
/// use coriplus_core::feed::mention::extract_mentions;
///
/// let mentions = extract_mentions("thanks +alice and +jane.doe. cc +alice");
/// assert_eq!(mentions.into_iter().collect::<Vec<_>>(), vec!["alice", "jane.doe"]);
/// ```
#[must_use]
pub fn extract_mentions(text: &str) -> BTreeSet<String> {
    MENTION
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Returns whether `mentioned` should be notified about `message`.
///
/// Authors are never notified about their own messages. Otherwise the
/// mentioned user must be able to see the message outside the explore feed.
///
/// # Errors
///
/// Returns an error if the follow graph cannot be read.
pub fn should_notify<G>(message: &Message, mentioned: UserId, graph: &G) -> Result<bool>
where
    G: RelationshipGraph + ?Sized,
{
    if message.is_authored_by(mentioned) {
        return Ok(false);
    }
    audience_allows(message.privacy, message.author, Some(mentioned), false, graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::memory::MemoryFeed;
    use crate::social::types::{MessageId, Privacy};

    fn mentions(text: &str) -> Vec<String> {
        extract_mentions(text).into_iter().collect()
    }

    #[test]
    fn extracts_simple_mentions() {
        assert_eq!(mentions("hi +bob"), vec!["bob"]);
        assert_eq!(mentions("+bob+carol"), vec!["bob", "carol"]);
    }

    #[test]
    fn extracts_dotted_mentions() {
        assert_eq!(mentions("hi +jane.doe!"), vec!["jane.doe"]);
        assert_eq!(mentions("hi +a.b.c"), vec!["a.b.c"]);
    }

    #[test]
    fn trailing_dot_is_not_part_of_the_mention() {
        assert_eq!(mentions("see +bob."), vec!["bob"]);
        assert_eq!(mentions("see +bob..carol"), vec!["bob"]);
    }

    #[test]
    fn ignores_bare_plus_signs() {
        assert!(mentions("1 + 1 = 2").is_empty());
        assert!(mentions("+").is_empty());
        assert_eq!(mentions("++bob"), vec!["bob"]);
    }

    #[test]
    fn mentions_stop_at_non_word_characters() {
        assert_eq!(mentions("(+bob) [+carol_1]"), vec!["bob", "carol_1"]);
        assert_eq!(mentions("+a.b.c.-d +x-y"), vec!["a.b.c", "x"]);
        assert_eq!(mentions("mail bob+tag@example.org"), vec!["tag"]);
    }

    #[test]
    fn deduplicates_mentions() {
        assert_eq!(mentions("+bob +bob +bob"), vec!["bob"]);
    }

    #[test]
    fn handles_non_ascii_text() {
        assert_eq!(mentions("ciao +bob, perché +é"), vec!["bob"]);
    }

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const CAROL: UserId = UserId(3);

    fn message(privacy: Privacy) -> Message {
        Message {
            id: MessageId(1),
            author: ALICE,
            text: "hi +bob +carol".to_string(),
            published_at: chrono::DateTime::<chrono::Utc>::default(),
            privacy,
        }
    }

    fn graph() -> MemoryFeed {
        let mut feed = MemoryFeed::new();
        feed.follow(ALICE, BOB);
        feed.follow(BOB, ALICE);
        feed.follow(CAROL, ALICE);
        feed
    }

    #[test]
    fn public_and_unlisted_notify_everyone() {
        for privacy in [Privacy::Public, Privacy::Unlisted] {
            assert!(should_notify(&message(privacy), BOB, &graph()).unwrap());
            assert!(should_notify(&message(privacy), CAROL, &graph()).unwrap());
        }
    }

    #[test]
    fn friends_notify_mutual_followers_only() {
        assert!(should_notify(&message(Privacy::Friends), BOB, &graph()).unwrap());
        assert!(!should_notify(&message(Privacy::Friends), CAROL, &graph()).unwrap());
    }

    #[test]
    fn only_me_notifies_nobody() {
        assert!(!should_notify(&message(Privacy::OnlyMe), BOB, &graph()).unwrap());
    }

    #[test]
    fn authors_are_not_notified_about_themselves() {
        assert!(!should_notify(&message(Privacy::Public), ALICE, &graph()).unwrap());
    }
}
