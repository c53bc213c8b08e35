//! Physical time effects.

use crate::time::Timestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for time operations.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum TimeError {
    /// The clock could not be read
    #[error("Clock unavailable: {reason}")]
    ClockUnavailable {
        /// OS or handler message
        reason: String,
    },
}

/// Wall-clock access.
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current wall-clock time.
    async fn physical_time(&self) -> Result<Timestamp, TimeError>;
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for std::sync::Arc<T> {
    async fn physical_time(&self) -> Result<Timestamp, TimeError> {
        (**self).physical_time().await
    }
}
