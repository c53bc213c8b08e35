//! Fault injection for document stores
//!
//! [`FlakyStore`] forwards to an inner store but answers chosen calls with
//! `StoreError::Unavailable`, so retry, compensation and degradation paths
//! can be driven from tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use warble_core::document::{Document, DocumentPath, Query, WriteBatch};
use warble_core::effects::{DocumentStoreEffects, QuerySubscription, StoreError};
use warble_core::Timestamp;

/// How many upcoming calls of each kind should fail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Failing `commit` calls
    pub commits: u32,
    /// Failing `get` / `query` calls
    pub reads: u32,
    /// Failing `subscribe` calls
    pub subscribes: u32,
    /// Failing `server_timestamp` calls
    pub timestamps: u32,
    /// Fail everything until cleared
    pub outage: bool,
}

/// Store wrapper that fails on demand. Clones share the same plan.
#[derive(Debug, Clone)]
pub struct FlakyStore<S> {
    inner: S,
    plan: Arc<Mutex<FaultPlan>>,
    injected: Arc<AtomicU64>,
}

impl<S> FlakyStore<S> {
    /// Wrap `inner` with no faults planned
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            plan: Arc::new(Mutex::new(FaultPlan::default())),
            injected: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail the next `n` commits
    pub fn fail_commits(&self, n: u32) {
        self.plan.lock().commits = n;
    }

    /// Fail the next `n` reads
    pub fn fail_reads(&self, n: u32) {
        self.plan.lock().reads = n;
    }

    /// Fail the next `n` subscribe calls
    pub fn fail_subscribes(&self, n: u32) {
        self.plan.lock().subscribes = n;
    }

    /// Fail the next `n` timestamp requests
    pub fn fail_timestamps(&self, n: u32) {
        self.plan.lock().timestamps = n;
    }

    /// Start or end a full outage
    pub fn set_outage(&self, outage: bool) {
        self.plan.lock().outage = outage;
    }

    /// Drop every planned fault
    pub fn clear(&self) {
        *self.plan.lock() = FaultPlan::default();
    }

    /// Number of faults injected so far
    pub fn injected(&self) -> u64 {
        self.injected.load(Ordering::SeqCst)
    }

    fn trip(&self, operation: &str, pick: fn(&mut FaultPlan) -> &mut u32) -> Result<(), StoreError> {
        let mut plan = self.plan.lock();
        let fail = if plan.outage {
            true
        } else {
            let remaining = pick(&mut *plan);
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        };
        drop(plan);

        if fail {
            self.injected.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(operation, "injecting store fault");
            return Err(StoreError::unavailable(format!("injected fault in {operation}")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentStoreEffects> DocumentStoreEffects for FlakyStore<S> {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        self.trip("get", |p| &mut p.reads)?;
        self.inner.get(path).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.trip("query", |p| &mut p.reads)?;
        self.inner.query(query).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.trip("commit", |p| &mut p.commits)?;
        self.inner.commit(batch).await
    }

    async fn server_timestamp(&self) -> Result<Timestamp, StoreError> {
        self.trip("server_timestamp", |p| &mut p.timestamps)?;
        self.inner.server_timestamp().await
    }

    async fn subscribe(&self, query: Query) -> Result<QuerySubscription, StoreError> {
        self.trip("subscribe", |p| &mut p.subscribes)?;
        self.inner.subscribe(query).await
    }
}
