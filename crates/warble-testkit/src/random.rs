//! Deterministic identifiers

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use warble_core::effects::RandomEffects;

/// Counter-backed randomness: the n-th UUID is `Uuid::from_u128(namespace << 64 | n)`
#[derive(Debug, Clone)]
pub struct SequentialRandom {
    namespace: u64,
    counter: Arc<AtomicU64>,
}

impl SequentialRandom {
    /// Sequence in `namespace`, starting at 1
    pub fn new(namespace: u64) -> Self {
        Self {
            namespace,
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialRandom {
    fn default() -> Self {
        Self::new(0xABCD)
    }
}

#[async_trait]
impl RandomEffects for SequentialRandom {
    async fn random_u64(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    async fn random_uuid(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Uuid::from_u128((u128::from(self.namespace) << 64) | u128::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uuids_are_distinct_and_reproducible() {
        let a = SequentialRandom::new(1);
        let b = SequentialRandom::new(1);
        let first = a.random_uuid().await;
        assert_ne!(first, a.random_uuid().await);
        assert_eq!(first, b.random_uuid().await);
    }
}
