//! Warble Testkit - Shared Test Infrastructure
//!
//! Deterministic and fault-injecting effect handlers plus fixtures for the
//! test suites of every Warble crate:
//!
//! - [`ManualClock`], [`SequentialRandom`]: reproducible time and ids
//! - [`FlakyStore`]: wraps any store and fails chosen calls as unavailable
//! - [`TestEffects`]: the above combined over an in-memory store
//! - [`fixtures`]: well-known users and zero-delay retry policies
//! - [`strategies`]: proptest strategies for identifiers and text
//! - [`init_tracing`]: log output for failing tests (`RUST_LOG=debug`)

pub mod clock;
pub mod effects;
pub mod faults;
pub mod fixtures;
pub mod random;
pub mod strategies;

pub use clock::ManualClock;
pub use effects::TestEffects;
pub use faults::{FaultPlan, FlakyStore};
pub use random::SequentialRandom;

/// Install a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG`; output goes through the test harness capture.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
