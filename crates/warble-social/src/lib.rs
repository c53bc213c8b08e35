//! Warble Social - Social Graph and Engagement Layer
//!
//! Follows, posts with nested replies, likes and retweets, and feeds, built
//! on the document store effects of `warble-core`:
//!
//! - [`ProfileStore`]: profiles created on first sign-in, owner-only edits
//! - [`SocialGraph`]: follow edges, at most one per ordered pair
//! - [`ContentStore`]: posts, unbounded reply trees, cascading delete
//! - [`EngagementAggregator`]: like/retweet sets kept in step with each
//!   user's reverse index
//! - [`FeedComposer`]: global and following-only feeds, paginated and live
//! - [`EngagementView`]: optimistic like/retweet state for a view
//! - [`SocialService`]: all of the above behind one value
//!
//! # Architecture
//!
//! This is a **feature** crate. Services hold only configuration and take
//! their effects per call, so the same service value works against the
//! in-memory store of `warble-effects`, a hosted store, or the fault
//! injecting wrappers of `warble-testkit`.
//!
//! Every multi-record mutation is a single [`WriteBatch`]: a like and its
//! reverse index entry, or a post and its whole subtree, change together or
//! not at all.
//!
//! [`WriteBatch`]: warble_core::document::WriteBatch

pub mod config;
pub mod content;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod graph;
pub mod layout;
pub mod optimistic;
pub mod profile;
pub mod records;
pub mod service;
mod store;

use warble_core::effects::{DocumentStoreEffects, RandomEffects};

/// Effects every social operation may need.
pub trait SocialEffects: DocumentStoreEffects + RandomEffects {}

impl<T: DocumentStoreEffects + RandomEffects + ?Sized> SocialEffects for T {}

// Re-export primary types
pub use config::{CascadeConfig, FeedConfig, ProfileDefaults, SocialConfig};
pub use content::{CascadeReport, ContentStore};
pub use engagement::{EngagementAggregator, EngagementKind, EngagementSummary, ToggleOutcome};
pub use error::{Result, SocialError};
pub use feed::{FeedComposer, FeedCursor, FeedMode, FeedPage, FeedWatcher, PageRequest};
pub use graph::SocialGraph;
pub use layout::ContentPath;
pub use optimistic::{EngagementView, PendingToggle};
pub use profile::{normalize_pseudo, ProfileStore};
pub use records::{FollowEdge, Media, Membership, Post, Profile, ProfileUpdate, Reply, ReverseIndexEntry};
pub use service::SocialService;
