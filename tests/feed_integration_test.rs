//! Integration tests for feeds over `SQLite` storage.
//!
//! These tests verify:
//! - `SocialManager` lifecycle on disk
//! - Home, explore and profile feeds through the privacy table
//! - Pagination totals, empty pages past the end and page stability
//! - Follow graph idempotence and sorted follow lists
//! - Mention notifications on post and edit

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use coriplus_core::feed::{
    feed_page, FeedError, FeedKind, FeedPage, FeedRequest, FeedSettings,
};
use coriplus_core::social::{
    MessageId, NewUser, Privacy, SocialError, SocialManager, SocialStorage, UserId, Viewer,
};

// Atomic counter for unique test directories
static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    env::temp_dir().join(format!(
        "coriplus_feed_integ_{}_{}_{}",
        prefix,
        std::process::id(),
        id
    ))
}

fn cleanup_dir(dir: &PathBuf) {
    let _ = std::fs::remove_dir_all(dir);
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

fn ids(page: &FeedPage) -> Vec<MessageId> {
    page.messages.iter().map(|m| m.id).collect()
}

fn settings(page_size: usize) -> FeedSettings {
    FeedSettings::default().with_page_size(page_size)
}

fn request_page(
    storage: &SocialStorage,
    settings: &FeedSettings,
    request: &FeedRequest,
) -> Result<FeedPage, FeedError> {
    let reader = storage.reader().expect("should acquire reader");
    feed_page(&reader, settings, request)
}

/// The five-message stream used by the reference scenarios.
///
/// Newest first: A public, B friends (one-way follow), C only-me written by
/// someone other than the viewer, D unlisted, E only-me.
struct Scenario {
    storage: SocialStorage,
    viewer: UserId,
    author: UserId,
    a: MessageId,
    d: MessageId,
    dir: PathBuf,
}

impl Scenario {
    fn build(prefix: &str) -> Self {
        let dir = unique_temp_dir(prefix);
        std::fs::create_dir_all(&dir).unwrap();
        let storage = SocialStorage::new(&dir.join("social.db")).expect("should open storage");

        let viewer = storage.create_user(&NewUser::new("viewer"), at(0)).unwrap().id;
        let author = storage.create_user(&NewUser::new("author"), at(0)).unwrap().id;
        // one-way: the author does not follow back
        storage.follow(viewer, author, at(0)).unwrap();

        let post = |privacy, seconds| {
            storage
                .post_message(author, "scenario", privacy, at(seconds))
                .unwrap()
                .id
        };
        post(Privacy::OnlyMe, 1);
        let d = post(Privacy::Unlisted, 2);
        post(Privacy::OnlyMe, 3);
        post(Privacy::Friends, 4);
        let a = post(Privacy::Public, 5);

        Self {
            storage,
            viewer,
            author,
            a,
            d,
            dir,
        }
    }
}

impl Drop for Scenario {
    fn drop(&mut self) {
        cleanup_dir(&self.dir);
    }
}

// ============================================================================
// Reference Scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[test]
    fn non_global_feed_for_stranger_shows_public_and_unlisted() {
        let scenario = Scenario::build("scenario_home");
        let settings = settings(2);
        let request = FeedRequest::new(FeedKind::Home, Viewer::User(scenario.viewer));

        let first = request_page(&scenario.storage, &settings, &request).unwrap();
        assert_eq!(ids(&first), vec![scenario.a, scenario.d]);
        assert_eq!(first.total_visible, 2);
        assert_eq!(first.total_pages, 1);
        assert!(!first.has_more);

        let second = request_page(&scenario.storage, &settings, &request.with_page(2)).unwrap();
        assert!(second.messages.is_empty());
    }

    #[test]
    fn profile_feed_matches_home_feed_for_the_same_viewer() {
        let scenario = Scenario::build("scenario_profile");
        let request = FeedRequest::new(
            FeedKind::Profile(scenario.author),
            Viewer::User(scenario.viewer),
        );
        let page = request_page(&scenario.storage, &settings(2), &request).unwrap();
        assert_eq!(ids(&page), vec![scenario.a, scenario.d]);
    }

    #[test]
    fn global_feed_for_anonymous_shows_public_only() {
        let scenario = Scenario::build("scenario_explore");
        let request = FeedRequest::new(FeedKind::Explore, Viewer::Anonymous);
        let page = request_page(&scenario.storage, &settings(2), &request).unwrap();
        assert_eq!(ids(&page), vec![scenario.a]);
        assert_eq!(page.total_visible, 1);
    }

    #[test]
    fn author_sees_everything_except_in_explore() {
        let scenario = Scenario::build("scenario_author");
        let author = Viewer::User(scenario.author);

        let profile = FeedRequest::new(FeedKind::Profile(scenario.author), author);
        let page = request_page(&scenario.storage, &settings(20), &profile).unwrap();
        assert_eq!(page.total_visible, 5);

        let explore = FeedRequest::new(FeedKind::Explore, author);
        let page = request_page(&scenario.storage, &settings(20), &explore).unwrap();
        assert!(page.messages.is_empty());
    }

    #[test]
    fn mutual_follow_reveals_friends_posts() {
        let scenario = Scenario::build("scenario_mutual");
        scenario
            .storage
            .follow(scenario.author, scenario.viewer, at(10))
            .unwrap();
        let request = FeedRequest::new(FeedKind::Home, Viewer::User(scenario.viewer));
        let page = request_page(&scenario.storage, &settings(20), &request).unwrap();
        assert_eq!(page.total_visible, 3);
    }
}

// ============================================================================
// Pagination Tests
// ============================================================================

mod pagination_tests {
    use super::*;

    fn storage_with_posts(prefix: &str, count: i64) -> (SocialStorage, UserId, PathBuf) {
        let dir = unique_temp_dir(prefix);
        std::fs::create_dir_all(&dir).unwrap();
        let storage = SocialStorage::new(&dir.join("social.db")).unwrap();
        let author = storage.create_user(&NewUser::new("poster"), at(0)).unwrap().id;
        for i in 0..count {
            let privacy = if i % 3 == 0 {
                Privacy::OnlyMe
            } else {
                Privacy::Public
            };
            storage
                .post_message(author, &format!("post {i}"), privacy, at(i))
                .unwrap();
        }
        (storage, author, dir)
    }

    #[test]
    fn pages_concatenate_to_the_visible_set() {
        let (storage, author, dir) = storage_with_posts("pages_concat", 25);
        let settings = settings(4);
        let request = FeedRequest::new(FeedKind::Profile(author), Viewer::Anonymous);

        let first = request_page(&storage, &settings, &request).unwrap();
        let mut seen = Vec::new();
        for page in 1..=i64::try_from(first.total_pages).unwrap() {
            let page = request_page(&storage, &settings, &request.with_page(page)).unwrap();
            seen.extend(ids(&page));
        }

        assert_eq!(seen.len(), first.total_visible);
        let mut deduped = seen.clone();
        deduped.dedup();
        assert_eq!(deduped, seen, "pages must not overlap");
        assert!(seen.windows(2).all(|pair| pair[0] > pair[1]), "newest first");

        cleanup_dir(&dir);
    }

    #[test]
    fn page_is_stable_on_unchanged_store() {
        let (storage, author, dir) = storage_with_posts("page_stable", 12);
        let request = FeedRequest::new(FeedKind::Profile(author), Viewer::Anonymous).with_page(2);
        let once = request_page(&storage, &settings(3), &request).unwrap();
        let twice = request_page(&storage, &settings(3), &request).unwrap();
        assert_eq!(once, twice);

        cleanup_dir(&dir);
    }

    #[test]
    fn page_past_the_end_is_empty_not_an_error() {
        let (storage, author, dir) = storage_with_posts("page_past_end", 5);
        let request = FeedRequest::new(FeedKind::Profile(author), Viewer::Anonymous).with_page(50);
        let page = request_page(&storage, &settings(2), &request).unwrap();
        assert!(page.messages.is_empty());
        assert!(!page.has_more);

        cleanup_dir(&dir);
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let (storage, author, dir) = storage_with_posts("page_invalid", 1);
        let request = FeedRequest::new(FeedKind::Profile(author), Viewer::Anonymous);
        assert!(matches!(
            request_page(&storage, &settings(2), &request.with_page(0)),
            Err(FeedError::InvalidPage(0))
        ));
        assert!(matches!(
            request_page(
                &storage,
                &settings(2),
                &FeedRequest::new(FeedKind::Profile(UserId(999)), Viewer::Anonymous)
            ),
            Err(FeedError::NotFound(_))
        ));
        assert!(matches!(
            request_page(
                &storage,
                &settings(2),
                &FeedRequest::new(FeedKind::Home, Viewer::Anonymous)
            ),
            Err(FeedError::AnonymousViewer)
        ));

        cleanup_dir(&dir);
    }
}

// ============================================================================
// SocialManager Tests
// ============================================================================

mod manager_tests {
    use super::*;

    #[test]
    fn manager_new_creates_data_directory() {
        let dir = unique_temp_dir("mgr_creates_dir");
        assert!(!dir.exists());

        let _manager =
            SocialManager::new(&dir, FeedSettings::default()).expect("should create manager");

        assert!(dir.is_dir());
        assert!(dir.join("social.db").exists());

        cleanup_dir(&dir);
    }

    #[test]
    fn manager_reopens_existing_data() {
        let dir = unique_temp_dir("mgr_reopen");
        {
            let manager = SocialManager::new(&dir, FeedSettings::default()).unwrap();
            let alice = manager.register(&NewUser::new("alice")).unwrap();
            manager.post(alice.id, "still here", Privacy::Public).unwrap();
        }

        let manager = SocialManager::new(&dir, FeedSettings::default()).unwrap();
        let page = manager
            .profile_feed("alice", Viewer::Anonymous, 1)
            .expect("should build profile feed");
        assert_eq!(page.messages[0].text, "still here");

        cleanup_dir(&dir);
    }

    #[test]
    fn follow_graph_is_idempotent_and_sorted() {
        let dir = unique_temp_dir("mgr_follow");
        let manager = SocialManager::new(&dir, FeedSettings::default()).unwrap();
        let hub = manager.register(&NewUser::new("hub")).unwrap().id;
        for name in ["zoe", "adam", "mia"] {
            let user = manager.register(&NewUser::new(name)).unwrap().id;
            assert!(manager.follow(user, hub).unwrap());
            assert!(!manager.follow(user, hub).unwrap());
        }

        let followers: Vec<_> = manager
            .followers(hub)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(followers, vec!["adam", "mia", "zoe"]);

        cleanup_dir(&dir);
    }

    #[test]
    fn registration_rules() {
        let dir = unique_temp_dir("mgr_register");
        let manager = SocialManager::new(&dir, FeedSettings::default()).unwrap();
        manager.register(&NewUser::new("jane.doe")).unwrap();
        assert!(matches!(
            manager.register(&NewUser::new("jane.doe")),
            Err(SocialError::AlreadyExists(_))
        ));
        assert!(matches!(
            manager.register(&NewUser::new("jane.org")),
            Err(SocialError::InvalidUsername(_))
        ));

        cleanup_dir(&dir);
    }

    #[test]
    fn mentions_follow_the_audience_rules() {
        let dir = unique_temp_dir("mgr_mentions");
        let manager = SocialManager::new(&dir, FeedSettings::default()).unwrap();
        let alice = manager.register(&NewUser::new("alice")).unwrap().id;
        let bob = manager.register(&NewUser::new("bob")).unwrap().id;
        manager.register(&NewUser::new("jane.doe")).unwrap();
        manager.follow(alice, bob).unwrap();
        manager.follow(bob, alice).unwrap();

        let outcome = manager
            .post(alice, "lunch? +bob +jane.doe", Privacy::Friends)
            .unwrap();
        let notified: Vec<_> = outcome.notify.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(notified, vec!["bob"]);

        let outcome = manager
            .edit(alice, outcome.message.id, "lunch? +bob +jane.doe", Privacy::Public)
            .unwrap();
        let notified: Vec<_> = outcome.notify.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(notified, vec!["bob", "jane.doe"]);

        cleanup_dir(&dir);
    }

    #[test]
    fn edited_message_moves_to_the_top() {
        let dir = unique_temp_dir("mgr_edit_bump");
        let manager = SocialManager::new(&dir, settings(20)).unwrap();
        let alice = manager.register(&NewUser::new("alice")).unwrap().id;
        let storage = manager.storage();
        let old = storage
            .post_message(alice, "old", Privacy::Public, at(1))
            .unwrap();
        storage
            .post_message(alice, "newer", Privacy::Public, at(2))
            .unwrap();
        storage
            .edit_message(alice, old.id, "old, edited", Privacy::Public, at(3))
            .unwrap();

        let page = manager
            .feed(&FeedRequest::new(FeedKind::Explore, Viewer::Anonymous))
            .unwrap();
        assert_eq!(page.messages[0].id, old.id);
        assert_eq!(page.messages[0].text, "old, edited");

        cleanup_dir(&dir);
    }
}
