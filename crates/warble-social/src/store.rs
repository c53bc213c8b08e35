//! Retrying store access shared by the services
//!
//! Transient failures ([`StoreError::is_transient`]) are retried under the
//! configured policy and logged; everything else surfaces on the first
//! attempt.

use crate::error::{Result, SocialError};
use warble_core::document::{Document, DocumentPath, Query, WriteBatch};
use warble_core::effects::{DocumentStoreEffects, QuerySubscription, StoreError};
use warble_core::reliability::RetryPolicy;
use warble_core::time::Timestamp;

fn transient(operation: &'static str) -> impl Fn(&StoreError) -> bool {
    move |err| {
        let retry = err.is_transient();
        if retry {
            tracing::warn!(operation, error = %err, "transient store failure");
        }
        retry
    }
}

/// Commit a batch, retrying transient failures.
pub(crate) async fn commit<E>(
    effects: &E,
    retry: &RetryPolicy,
    operation: &'static str,
    batch: WriteBatch,
) -> Result<()>
where
    E: DocumentStoreEffects + ?Sized,
{
    retry
        .execute_if(|| effects.commit(batch.clone()), transient(operation))
        .await
        .map_err(SocialError::from)
}

/// Read one document, retrying transient failures.
pub(crate) async fn get<E>(
    effects: &E,
    retry: &RetryPolicy,
    path: &DocumentPath,
) -> Result<Option<Document>>
where
    E: DocumentStoreEffects + ?Sized,
{
    retry
        .execute_if(|| effects.get(path), transient("get"))
        .await
        .map_err(SocialError::from)
}

/// Run a query, retrying transient failures.
pub(crate) async fn query<E>(effects: &E, retry: &RetryPolicy, query: &Query) -> Result<Vec<Document>>
where
    E: DocumentStoreEffects + ?Sized,
{
    retry
        .execute_if(|| effects.query(query), transient("query"))
        .await
        .map_err(SocialError::from)
}

/// Count a query's matches, retrying transient failures.
pub(crate) async fn count<E>(effects: &E, retry: &RetryPolicy, query: &Query) -> Result<usize>
where
    E: DocumentStoreEffects + ?Sized,
{
    retry
        .execute_if(|| effects.count(query), transient("count"))
        .await
        .map_err(SocialError::from)
}

/// Fresh server timestamp, retrying transient failures.
pub(crate) async fn timestamp<E>(effects: &E, retry: &RetryPolicy) -> Result<Timestamp>
where
    E: DocumentStoreEffects + ?Sized,
{
    retry
        .execute_if(|| effects.server_timestamp(), transient("server_timestamp"))
        .await
        .map_err(SocialError::from)
}

/// Subscribe to a query, retrying transient failures.
pub(crate) async fn subscribe<E>(
    effects: &E,
    retry: &RetryPolicy,
    query: Query,
) -> Result<QuerySubscription>
where
    E: DocumentStoreEffects + ?Sized,
{
    retry
        .execute_if(|| effects.subscribe(query.clone()), transient("subscribe"))
        .await
        .map_err(SocialError::from)
}
