//! Randomness effects
//!
//! Identifiers for new posts and replies are drawn from here so tests can
//! substitute a deterministic sequence.

use async_trait::async_trait;
use uuid::Uuid;

/// Source of identifiers and random numbers.
#[async_trait]
pub trait RandomEffects: Send + Sync {
    /// Random 64-bit value.
    async fn random_u64(&self) -> u64;

    /// Fresh UUID.
    async fn random_uuid(&self) -> Uuid;
}

#[async_trait]
impl<T: RandomEffects + ?Sized> RandomEffects for std::sync::Arc<T> {
    async fn random_u64(&self) -> u64 {
        (**self).random_u64().await
    }

    async fn random_uuid(&self) -> Uuid {
        (**self).random_uuid().await
    }
}
