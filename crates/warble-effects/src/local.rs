//! Combined handler for single-process use
//!
//! Bundles a document store with a randomness source so services that need
//! both can take a single effects value.

use async_trait::async_trait;
use uuid::Uuid;
use warble_core::document::{Document, DocumentPath, Query, WriteBatch};
use warble_core::effects::{
    DocumentStoreEffects, QuerySubscription, RandomEffects, StoreError,
};
use warble_core::Timestamp;

use crate::random::OsRandom;
use crate::store::MemoryDocumentStore;

/// Store plus randomness, delegating each trait to its part
#[derive(Debug, Clone)]
pub struct LocalEffects<S = MemoryDocumentStore, R = OsRandom> {
    store: S,
    random: R,
}

impl LocalEffects {
    /// Fresh in-memory store with OS randomness
    pub fn in_memory() -> Self {
        Self::new(MemoryDocumentStore::new(), OsRandom::new())
    }
}

impl<S, R> LocalEffects<S, R> {
    /// Combine explicit handlers
    pub fn new(store: S, random: R) -> Self {
        Self { store, random }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying randomness source
    pub fn random(&self) -> &R {
        &self.random
    }
}

#[async_trait]
impl<S, R> DocumentStoreEffects for LocalEffects<S, R>
where
    S: DocumentStoreEffects,
    R: Send + Sync,
{
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

    async fn count(&self, query: &Query) -> Result<usize, StoreError> {
        self.store.count(query).await
    }
}

#[async_trait]
impl<S, R> RandomEffects for LocalEffects<S, R>
where
    S: Send + Sync,
    R: RandomEffects,
{
    async fn random_u64(&self) -> u64 {
        self.random.random_u64().await
    }

    async fn random_uuid(&self) -> Uuid {
        self.random.random_uuid().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warble_core::CollectionPath;

    #[tokio::test]
    async fn test_local_effects_delegate_to_store() {
        let effects = LocalEffects::in_memory();
        let path = CollectionPath::root("posts").doc(effects.random_uuid().await);
        effects
            .commit(WriteBatch::new().create(path.clone(), json!({"content": "hi"})))
            .await
            .unwrap();

        assert!(effects.exists(&path).await.unwrap());
        assert_eq!(effects.store().document_count(), 1);
    }
}
