//! Random effect handler
//!
//! Uses the thread RNG; this is the handler layer where real randomness is
//! allowed.

#![allow(clippy::disallowed_methods)]

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;
use warble_core::effects::RandomEffects;

/// Randomness from the operating system seeded thread RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl OsRandom {
    /// Create a new handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RandomEffects for OsRandom {
    async fn random_u64(&self) -> u64 {
        rand::thread_rng().gen()
    }

    async fn random_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}
