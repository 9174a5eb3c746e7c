//! Visibility-aware feeds.
//!
//! This module turns a reverse-chronological candidate stream into pages of
//! the messages a given viewer may see.
//!
//! # Architecture
//!
//! ```text
//! feed_page (entry point)
//!     ├── CandidateQuery (which messages a feed considers)
//!     └── Paginator (count / page / has_more)
//!             ├── Filtered (lazy filtered sequence)
//!             └── privacy::is_visible (decision table)
//!                     └── RelationshipGraph (follow edges)
//! ```
//!
//! # Cost Model
//!
//! Nothing is cached. Every `count` walks the whole candidate stream and
//! every `page` walks from the newest message until the page is full.
//!
//! # Example
//!
//! ```
//! use coriplus_core::feed::{feed_page, FeedKind, FeedRequest, FeedSettings};
//! use coriplus_core::social::{NewUser, Privacy, SocialStorage, Viewer};
//! use chrono::Utc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let storage = SocialStorage::new(&dir.path().join("social.db")).unwrap();
//! let alice = storage.create_user(&NewUser::new("alice"), Utc::now()).unwrap();
//! storage.post_message(alice.id, "hello", Privacy::Public, Utc::now()).unwrap();
//!
//! let reader = storage.reader().unwrap();
//! let request = FeedRequest::new(FeedKind::Explore, Viewer::Anonymous);
//! let page = feed_page(&reader, &FeedSettings::default(), &request).unwrap();
//! assert_eq!(page.total_visible, 1);
//! ```

mod error;
mod graph;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod mention;
mod paginate;
pub mod privacy;
mod service;
mod settings;
mod stream;

pub use error::{FeedError, Result};
pub use graph::RelationshipGraph;
pub use paginate::{Filtered, PageNumber, Paginator};
pub use privacy::is_visible;
pub use service::{feed_page, FeedPage, FeedRequest};
pub use settings::{FeedSettings, DEFAULT_PAGE_SIZE};
pub use stream::{CandidateQuery, CandidateSource, Candidates, FeedKind};
