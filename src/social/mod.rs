//! Users, follow edges and messages.
//!
//! This module owns the social data the feeds are built from and the
//! operations that change it.
//!
//! # Architecture
//!
//! ```text
//! SocialManager (high-level API)
//!     ├── SocialStorage (SQLite for users, follows and messages)
//!     │       └── StoreReader (locked view implementing the feed traits)
//!     └── feed (pagination, privacy and mention policy)
//! ```
//!
//! # Types
//!
//! - [`User`]: A registered account
//! - [`Message`]: A post with a [`Privacy`] level
//! - [`Viewer`]: Who is looking at a feed, possibly nobody

mod error;
mod manager;
mod storage;
pub mod types;

pub use error::{Result, SocialError};
pub use manager::{PostOutcome, SocialManager};
pub use storage::{SocialStorage, StoreReader};
pub use types::{AccountStatus, Message, MessageId, NewUser, Privacy, User, UserId, Viewer};
