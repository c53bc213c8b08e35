//! In-memory realtime document store
//!
//! Holds every document in a single map behind a synchronous lock; no await
//! point is ever reached while the lock is held. Each successful commit bumps
//! the store version and re-evaluates the subscriptions whose collection was
//! touched, pushing a fresh snapshot only when the result set changed.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use warble_core::document::{CollectionPath, Document, DocumentPath, Query, Write, WriteBatch};
use warble_core::effects::{
    DocumentStoreEffects, PhysicalTimeEffects, QuerySnapshot, QuerySubscription, StoreError,
    SubscriptionId,
};
use warble_core::Timestamp;

use crate::time::SystemClock;

struct Subscriber {
    query: Query,
    sender: watch::Sender<QuerySnapshot>,
}

#[derive(Default)]
struct StoreState {
    documents: BTreeMap<DocumentPath, Document>,
    version: u64,
    last_timestamp: Timestamp,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_subscription: SubscriptionId,
}

impl StoreState {
    fn snapshot(&self, query: &Query) -> QuerySnapshot {
        QuerySnapshot {
            documents: query.evaluate(self.documents.values()),
            version: self.version,
        }
    }

    /// Check every precondition against the state the batch would see.
    fn check_preconditions(&self, writes: &[Write]) -> Result<(), StoreError> {
        let mut staged: HashMap<&DocumentPath, bool> = HashMap::new();
        for write in writes {
            let path = write.path();
            let exists = staged
                .get(path)
                .copied()
                .unwrap_or_else(|| self.documents.contains_key(path));
            match write {
                Write::Create { .. } if exists => return Err(StoreError::already_exists(path)),
                Write::Delete {
                    must_exist: true, ..
                } if !exists => return Err(StoreError::not_found(path)),
                Write::Create { .. } | Write::Set { .. } => {
                    staged.insert(path, true);
                }
                Write::Delete { .. } => {
                    staged.insert(path, false);
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, writes: Vec<Write>) -> Vec<CollectionPath> {
        let mut touched = Vec::new();
        for write in writes {
            touched.push(write.path().parent());
            match write {
                Write::Create { path, data } | Write::Set { path, data } => {
                    self.documents
                        .insert(path.clone(), Document::new(path, data));
                }
                Write::Delete { path, .. } => {
                    self.documents.remove(&path);
                }
            }
        }
        touched.sort();
        touched.dedup();
        touched
    }

    fn notify(&mut self, touched: &[CollectionPath]) {
        let version = self.version;
        let documents = &self.documents;
        self.subscribers.retain(|id, subscriber| {
            if subscriber.sender.is_closed() {
                tracing::debug!(subscription = id, "dropping closed subscription");
                return false;
            }
            if touched.contains(&subscriber.query.collection) {
                let next = subscriber.query.evaluate(documents.values());
                subscriber.sender.send_if_modified(|current| {
                    if current.documents == next {
                        false
                    } else {
                        *current = QuerySnapshot {
                            documents: next,
                            version,
                        };
                        true
                    }
                });
            }
            true
        });
    }
}

/// Document store kept in process memory
///
/// Cloning shares the same underlying data and subscriptions.
pub struct MemoryDocumentStore<C = SystemClock> {
    state: Arc<Mutex<StoreState>>,
    clock: C,
}

impl MemoryDocumentStore<SystemClock> {
    /// Create an empty store on the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }
}

impl Default for MemoryDocumentStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone> Clone for MemoryDocumentStore<C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<C> fmt::Debug for MemoryDocumentStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryDocumentStore")
            .field("documents", &state.documents.len())
            .field("version", &state.version)
            .field("subscriptions", &state.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl<C> MemoryDocumentStore<C> {
    /// Create an empty store using `clock` for server timestamps
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            clock,
        }
    }

    /// Number of stored documents
    pub fn document_count(&self) -> usize {
        self.state.lock().documents.len()
    }

    /// Paths of every document at or below `root`
    pub fn paths_under(&self, root: &DocumentPath) -> Vec<DocumentPath> {
        self.state
            .lock()
            .documents
            .keys()
            .filter(|p| *p == root || p.is_descendant_of(root))
            .cloned()
            .collect()
    }

    /// Paths of every document in `collection` (direct children only)
    pub fn paths_in(&self, collection: &CollectionPath) -> Vec<DocumentPath> {
        self.state
            .lock()
            .documents
            .keys()
            .filter(|p| &p.parent() == collection)
            .cloned()
            .collect()
    }

    /// Number of registered subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Current change counter
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    fn release_handle(&self) -> impl FnOnce(SubscriptionId) + Send + Sync + 'static {
        let weak: Weak<Mutex<StoreState>> = Arc::downgrade(&self.state);
        move |id| {
            if let Some(state) = weak.upgrade() {
                state.lock().subscribers.remove(&id);
                tracing::trace!(subscription = id, "subscription released");
            }
        }
    }
}

#[async_trait]
impl<C> DocumentStoreEffects for MemoryDocumentStore<C>
where
    C: PhysicalTimeEffects,
{
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        path.validate()?;
        Ok(self.state.lock().documents.get(path).cloned())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        query.validate()?;
        Ok(query.evaluate(self.state.lock().documents.values()))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        for write in batch.writes() {
            write.path().validate()?;
        }

        let mut state = self.state.lock();
        state.check_preconditions(batch.writes())?;
        let writes = batch.len();
        let touched = state.apply(batch.into_writes());
        state.version += 1;
        state.notify(&touched);
        tracing::trace!(writes, version = state.version, "batch committed");
        Ok(())
    }

    async fn server_timestamp(&self) -> Result<Timestamp, StoreError> {
        let now = self
            .clock
            .physical_time()
            .await
            .map_err(|e| StoreError::unavailable(format!("clock: {e}")))?;
        let mut state = self.state.lock();
        let issued = now.max(state.last_timestamp.next());
        state.last_timestamp = issued;
        Ok(issued)
    }

    async fn subscribe(&self, query: Query) -> Result<QuerySubscription, StoreError> {
        query.validate()?;
        let release = self.release_handle();

        let mut state = self.state.lock();
        let id = state.next_subscription;
        state.next_subscription += 1;

        let (sender, receiver) = watch::channel(state.snapshot(&query));
        state.subscribers.insert(
            id,
            Subscriber {
                query: query.clone(),
                sender,
            },
        );
        drop(state);

        Ok(QuerySubscription::new(id, query, receiver, release))
    }
}
