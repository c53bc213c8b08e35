//! Warble Core - Interface Layer
//!
//! Foundation crate for the Warble social graph. It owns the vocabulary every
//! other crate speaks and no behaviour beyond pure helpers:
//!
//! - Identifiers: `UserId`, `PostId`, `ReplyId`
//! - Time: `Timestamp` (milliseconds, server assigned)
//! - Document model: `CollectionPath`, `DocumentPath`, `Document`, `Query`,
//!   `WriteBatch`
//! - Effect traits: `DocumentStoreEffects`, `RandomEffects`,
//!   `PhysicalTimeEffects`
//! - Reliability: `RetryPolicy`, `BackoffStrategy`
//! - Configuration: `WarbleConfig`
//!
//! # Architecture
//!
//! This is the **Layer 1 (Interface)** crate. Concrete handlers live in
//! `warble-effects`; domain services live in `warble-social` and receive their
//! effects per call, never through ambient state.

pub mod config;
pub mod document;
pub mod effects;
pub mod identifiers;
pub mod reliability;
pub mod time;

pub use config::{ConfigError, WarbleConfig};
pub use document::{
    CollectionPath, Cursor, Direction, Document, DocumentPath, Filter, OrderBy, Query, Write,
    WriteBatch,
};
pub use effects::{
    DocumentStoreEffects, PhysicalTimeEffects, QuerySnapshot, QuerySubscription, RandomEffects,
    StoreError, SubscriptionId, TimeError,
};
pub use identifiers::{PostId, ReplyId, UserId};
pub use reliability::{BackoffStrategy, RetryPolicy};
pub use time::Timestamp;
