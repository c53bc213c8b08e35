//! Property test strategies for Warble types

use proptest::prelude::*;
use uuid::Uuid;
use warble_core::identifiers::UserId;

// Re-export proptest for convenience
pub use proptest;

/// Users drawn from a small pool so collisions (same actor twice) happen
pub fn arb_user_id() -> impl Strategy<Value = UserId> {
    (1u64..16).prop_map(crate::fixtures::test_user)
}

/// Arbitrary user ids
pub fn arb_any_user_id() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

/// Non-blank post or reply text
pub fn arb_content() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,40}[a-zA-Z0-9]"
}

/// Whitespace-only text
pub fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,8}"
}

/// Handles as typed by users: optional leading `@`s around a word
pub fn arb_raw_pseudo() -> impl Strategy<Value = String> {
    ("@{0,3}", "[a-z][a-z0-9_]{0,14}").prop_map(|(ats, word)| format!("{ats}{word}"))
}
