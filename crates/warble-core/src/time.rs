//! Server-assigned timestamps

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the Unix epoch, as assigned by the document store.
///
/// Timestamps issued by one store are strictly increasing, so they double as
/// a creation order for feeds and threads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// The smallest timestamp strictly greater than `self`.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
