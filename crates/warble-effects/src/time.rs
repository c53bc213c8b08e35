//! Real time effect handler for production use

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use warble_core::effects::{PhysicalTimeEffects, TimeError};
use warble_core::Timestamp;

/// Wall clock backed by `SystemTime`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for SystemClock {
    #[allow(clippy::disallowed_methods)] // this is the one place allowed to read the OS clock
    async fn physical_time(&self) -> Result<Timestamp, TimeError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TimeError::ClockUnavailable {
                reason: e.to_string(),
            })?;
        Ok(Timestamp::from_millis(elapsed.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_system_clock_reads_wall_time_through_shared_handle() {
        let clock: Arc<dyn PhysicalTimeEffects> = Arc::new(SystemClock::new());
        let first = clock.physical_time().await.unwrap();
        let second = clock.physical_time().await.unwrap();
        // Later than 2020-01-01
        assert!(first > Timestamp::from_millis(1_577_836_800_000));
        assert!(second >= first);
    }
}
