//! Well-known test values

use std::time::Duration;
use uuid::Uuid;
use warble_core::identifiers::{PostId, UserId};
use warble_core::reliability::RetryPolicy;

/// Deterministic user for `seed`
pub fn test_user(seed: u64) -> UserId {
    UserId::from_uuid(Uuid::from_u128(0x5553_4552_0000_0000_0000_0000_0000_0000 | u128::from(seed)))
}

/// Deterministic post id for `seed`, for addressing posts that do not exist
pub fn test_post_id(seed: u64) -> PostId {
    PostId::from_uuid(Uuid::from_u128(0x504f_5354_0000_0000_0000_0000_0000_0000 | u128::from(seed)))
}

/// `n` distinct deterministic users
pub fn test_users(n: u64) -> Vec<UserId> {
    (1..=n).map(test_user).collect()
}

/// Email for a deterministic user
pub fn test_email(seed: u64) -> String {
    format!("user{seed}@warble.test")
}

/// Retry policy with the default attempt count and no waiting
pub fn instant_retry() -> RetryPolicy {
    RetryPolicy::fixed(Duration::ZERO)
}
