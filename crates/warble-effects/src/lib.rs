//! Warble Effects - Handler Layer
//!
//! Stateless (or self-contained) implementations of the effect traits in
//! `warble-core`:
//!
//! - [`MemoryDocumentStore`]: realtime document store kept in process memory,
//!   with atomic batches and push subscriptions
//! - [`SystemClock`]: wall clock backed by `SystemTime`
//! - [`OsRandom`]: identifiers from the thread RNG
//! - [`LocalEffects`]: the three combined, for single-process use
//!
//! Fault-injecting and deterministic variants live in `warble-testkit`.

pub mod local;
pub mod random;
pub mod store;
pub mod time;

pub use local::LocalEffects;
pub use random::OsRandom;
pub use store::MemoryDocumentStore;
pub use time::SystemClock;
