//! Deterministic effect bundle for tests

use crate::clock::ManualClock;
use crate::faults::FlakyStore;
use crate::random::SequentialRandom;
use async_trait::async_trait;
use uuid::Uuid;
use warble_core::document::{Document, DocumentPath, Query, WriteBatch};
use warble_core::effects::{DocumentStoreEffects, QuerySubscription, RandomEffects, StoreError};
use warble_core::Timestamp;
use warble_effects::MemoryDocumentStore;

/// In-memory store on a manual clock, behind a fault injector, with
/// sequential ids. Clones share all state.
#[derive(Debug, Clone)]
pub struct TestEffects {
    store: FlakyStore<MemoryDocumentStore<ManualClock>>,
    random: SequentialRandom,
    clock: ManualClock,
}

impl TestEffects {
    /// Fresh effects with the clock at 1s past the epoch
    pub fn new() -> Self {
        let clock = ManualClock::starting_at(1_000);
        Self {
            store: FlakyStore::new(MemoryDocumentStore::with_clock(clock.clone())),
            random: SequentialRandom::default(),
            clock,
        }
    }

    /// Underlying in-memory store, bypassing fault injection
    pub fn store(&self) -> &MemoryDocumentStore<ManualClock> {
        self.store.inner()
    }

    /// Fault injector in front of the store
    pub fn faults(&self) -> &FlakyStore<MemoryDocumentStore<ManualClock>> {
        &self.store
    }

    /// Clock driving server timestamps
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }
}

impl Default for TestEffects {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStoreEffects for TestEffects {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        self.store.get(path).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.store.query(query).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.store.commit(batch).await
    }

    async fn server_timestamp(&self) -> Result<Timestamp, StoreError> {
        self.store.server_timestamp().await
    }

    async fn subscribe(&self, query: Query) -> Result<QuerySubscription, StoreError> {
        self.store.subscribe(query).await
    }
}

#[async_trait]
impl RandomEffects for TestEffects {
    async fn random_u64(&self) -> u64 {
        self.random.random_u64().await
    }

    async fn random_uuid(&self) -> Uuid {
        self.random.random_uuid().await
    }
}
