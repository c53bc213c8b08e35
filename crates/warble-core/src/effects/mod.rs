//! Effect traits
//!
//! Interfaces to everything outside the process: the hosted document store,
//! the clock and the randomness source. Handlers live in `warble-effects`
//! and `warble-testkit`; services take them per call.

pub mod random;
pub mod store;
pub mod time;

pub use random::RandomEffects;
pub use store::{
    to_document_value, DocumentStoreEffects, QuerySnapshot, QuerySubscription, StoreError,
    SubscriptionId,
};
pub use time::{PhysicalTimeEffects, TimeError};
