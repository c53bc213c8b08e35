//! Manually advanced clock

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use warble_core::effects::{PhysicalTimeEffects, TimeError};
use warble_core::Timestamp;

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at `start_ms`
    pub fn starting_at(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to `ms` (never backwards)
    pub fn set(&self, ms: u64) {
        self.now_ms.fetch_max(ms, Ordering::SeqCst);
    }

    /// Current reading
    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl PhysicalTimeEffects for ManualClock {
    async fn physical_time(&self) -> Result<Timestamp, TimeError> {
        Ok(self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_physical_time_tracks_manual_moves() {
        let clock = ManualClock::starting_at(500);
        let shared = clock.clone();
        assert_eq!(clock.physical_time().await.unwrap(), Timestamp::from_millis(500));

        shared.advance(250);
        assert_eq!(clock.physical_time().await.unwrap(), Timestamp::from_millis(750));

        // Never backwards
        clock.set(100);
        assert_eq!(clock.physical_time().await.unwrap(), Timestamp::from_millis(750));
    }
}
