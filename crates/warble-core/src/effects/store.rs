//! Document Store Effects
//!
//! The hosted document database the social graph runs against: individually
//! addressed records, ordered queries with equality/membership filters,
//! atomic write batches, and push subscriptions that redeliver the full
//! result set of a query whenever it changes.
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `warble-effects` (in-memory), `warble-testkit` (fault injection)
//! - **Usage**: every `warble-social` service
//!
//! # Subscriptions
//!
//! `subscribe()` hands back a [`QuerySubscription`]. The handle owns the
//! delivery registration: dropping it releases the registration, so a view
//! that bails out early on an error path cannot leak a callback.

use crate::document::{Document, DocumentPath, Query, WriteBatch};
use crate::time::Timestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::watch;

/// Errors from document store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StoreError {
    /// Backend unreachable or overloaded; safe to retry.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Backend-provided reason
        reason: String,
    },

    /// Transaction aborted by contention; safe to retry.
    #[error("store aborted the write: {reason}")]
    Aborted {
        /// Backend-provided reason
        reason: String,
    },

    /// A `Create` precondition failed.
    #[error("document already exists: {path}")]
    AlreadyExists {
        /// Conflicting document
        path: String,
    },

    /// A `Delete { must_exist }` precondition failed.
    #[error("document not found: {path}")]
    NotFound {
        /// Missing document
        path: String,
    },

    /// Malformed path.
    #[error("invalid path: {reason}")]
    InvalidPath {
        /// What is wrong with the path
        reason: String,
    },

    /// Malformed query.
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// What is wrong with the query
        reason: String,
    },

    /// Record body could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Codec message
        reason: String,
    },
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create an aborted error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Create an already-exists error.
    pub fn already_exists(path: &DocumentPath) -> Self {
        Self::AlreadyExists {
            path: path.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(path: &DocumentPath) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Create an invalid query error.
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Whether the same call may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Aborted { .. })
    }
}

/// Encode a record for storage.
pub fn to_document_value<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record)
        .map_err(|e| StoreError::serialization(format!("failed to encode record: {e}")))
}

/// Identifier of a live subscription inside its store.
pub type SubscriptionId = u64;

/// Full result set of a subscribed query at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySnapshot {
    /// Matching documents in query order
    pub documents: Vec<Document>,
    /// Store change counter at which this snapshot was taken
    pub version: u64,
}

impl QuerySnapshot {
    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when the query matched nothing.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

type ReleaseFn = Box<dyn FnOnce(SubscriptionId) + Send + Sync>;

/// Handle to a live query.
///
/// The first call to [`next`](Self::next) yields the snapshot current at
/// subscribe time; later calls wait for the next change. Dropping the
/// handle unregisters it from the store.
pub struct QuerySubscription {
    id: SubscriptionId,
    query: Query,
    receiver: watch::Receiver<QuerySnapshot>,
    initial_pending: bool,
    release: Option<ReleaseFn>,
}

impl QuerySubscription {
    /// Wrap a store-side channel. `release` runs exactly once, on drop.
    pub fn new<F>(
        id: SubscriptionId,
        query: Query,
        receiver: watch::Receiver<QuerySnapshot>,
        release: F,
    ) -> Self
    where
        F: FnOnce(SubscriptionId) + Send + Sync + 'static,
    {
        Self {
            id,
            query,
            receiver,
            initial_pending: true,
            release: Some(Box::new(release)),
        }
    }

    /// Store-assigned id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The query this subscription follows.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Latest delivered snapshot, without waiting.
    pub fn current(&self) -> QuerySnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store has shut the subscription down.
    pub async fn next(&mut self) -> Option<QuerySnapshot> {
        if self.initial_pending {
            self.initial_pending = false;
            return Some(self.receiver.borrow_and_update().clone());
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Release the subscription explicitly.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl fmt::Debug for QuerySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("id", &self.id)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// Document store operations.
///
/// All multi-record mutations go through [`commit`](Self::commit) so that
/// related records (a like and its reverse-index entry, a post and its
/// replies) change together or not at all.
#[async_trait]
pub trait DocumentStoreEffects: Send + Sync {
    /// Read one document.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// Run a one-shot query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Apply a batch atomically. Preconditions are checked before any write
    /// lands; a failing precondition aborts the whole batch.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Strictly increasing timestamp for this store.
    async fn server_timestamp(&self) -> Result<Timestamp, StoreError>;

    /// Subscribe to a query.
    async fn subscribe(&self, query: Query) -> Result<QuerySubscription, StoreError>;

    /// Number of documents a query matches.
    async fn count(&self, query: &Query) -> Result<usize, StoreError> {
        Ok(self.query(query).await?.len())
    }

    /// Whether a document exists.
    async fn exists(&self, path: &DocumentPath) -> Result<bool, StoreError> {
        Ok(self.get(path).await?.is_some())
    }
}

/// Blanket implementation for Arc<T> where T: DocumentStoreEffects
#[async_trait]
impl<T: DocumentStoreEffects + ?Sized> DocumentStoreEffects for std::sync::Arc<T> {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        (**self).get(path).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        (**self).query(query).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch).await
    }

    async fn server_timestamp(&self) -> Result<Timestamp, StoreError> {
        (**self).server_timestamp().await
    }

    async fn subscribe(&self, query: Query) -> Result<QuerySubscription, StoreError> {
        (**self).subscribe(query).await
    }

    async fn count(&self, query: &Query) -> Result<usize, StoreError> {
        (**self).count(query).await
    }

    async fn exists(&self, path: &DocumentPath) -> Result<bool, StoreError> {
        (**self).exists(path).await
    }
}
