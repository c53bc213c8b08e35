#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use warble_core::document::{Document, DocumentPath, Query, WriteBatch};
use warble_core::effects::{to_document_value, DocumentStoreEffects, QuerySubscription, StoreError};
use warble_core::identifiers::UserId;
use warble_core::Timestamp;
use warble_social::{
    ContentPath, EngagementKind, Membership, ReverseIndexEntry, SocialConfig, SocialService,
};
use warble_testkit::fixtures::{instant_retry, test_email, test_user};
use warble_testkit::TestEffects;

pub fn config() -> SocialConfig {
    SocialConfig {
        retry: instant_retry(),
        ..SocialConfig::default()
    }
}

pub fn setup() -> (SocialService, TestEffects) {
    warble_testkit::init_tracing();
    (SocialService::new(config()), TestEffects::new())
}

/// Sign in a deterministic user, creating their profile
pub async fn user(social: &SocialService, effects: &TestEffects, seed: u64) -> UserId {
    let id = test_user(seed);
    social
        .sign_in(effects, id, &test_email(seed), None)
        .await
        .unwrap();
    id
}

/// Store that lets a second client write around the next commit
///
/// `before` lands just ahead of the next commit, `after` right behind a
/// successful one. Both go straight to the wrapped effects.
#[derive(Debug, Clone, Default)]
pub struct RacingStore {
    inner: TestEffects,
    before: Arc<Mutex<Option<WriteBatch>>>,
    after: Arc<Mutex<Option<WriteBatch>>>,
}

impl RacingStore {
    pub fn new(inner: TestEffects) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Commit `batch` just before the next commit
    pub async fn before_next_commit(&self, batch: WriteBatch) {
        *self.before.lock().await = Some(batch);
    }

    /// Commit `batch` just after the next successful commit
    pub async fn after_next_commit(&self, batch: WriteBatch) {
        *self.after.lock().await = Some(batch);
    }
}

#[async_trait]
impl DocumentStoreEffects for RacingStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        self.inner.get(path).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(query).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let rival = self.before.lock().await.take();
        if let Some(rival) = rival {
            self.inner.commit(rival).await?;
        }
        self.inner.commit(batch).await?;
        let late = self.after.lock().await.take();
        if let Some(late) = late {
            self.inner.commit(late).await?;
        }
        Ok(())
    }

    async fn server_timestamp(&self) -> Result<Timestamp, StoreError> {
        self.inner.server_timestamp().await
    }

    async fn subscribe(&self, query: Query) -> Result<QuerySubscription, StoreError> {
        self.inner.subscribe(query).await
    }
}

/// Batch adding `user` to the `kind` set of `target`, both index sides
pub fn membership_batch(kind: EngagementKind, target: &ContentPath, user: UserId) -> WriteBatch {
    let at = Timestamp::from_millis(5);
    let membership = Membership { user, created_at: at };
    let entry = ReverseIndexEntry {
        target: target.clone(),
        created_at: at,
    };
    WriteBatch::new()
        .set(
            kind.member_document(target, user),
            to_document_value(&membership).unwrap(),
        )
        .set(
            kind.reverse_document(user, target),
            to_document_value(&entry).unwrap(),
        )
}
