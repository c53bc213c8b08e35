//! Social error types
//!
//! Validation and authorization failures are final. Only
//! [`SocialError::StoreUnavailable`] is worth retrying.

use thiserror::Error;
use warble_core::effects::StoreError;

/// Errors from social graph, content, engagement and feed operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocialError {
    /// Post with neither text nor media.
    #[error("post must have text or media")]
    EmptyPost,

    /// Reply with blank text.
    #[error("reply must have text")]
    EmptyReply,

    /// Actor is not allowed to perform the operation.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Why the actor was refused
        reason: String,
    },

    /// Target record does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Missing record
        what: String,
    },

    /// Record already exists (duplicate follow edge).
    #[error("already exists: {what}")]
    AlreadyExists {
        /// Conflicting record
        what: String,
    },

    /// Backend failed after retries.
    #[error("store unavailable: {reason}")]
    StoreUnavailable {
        /// Last backend error
        reason: String,
    },

    /// Malformed input.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Offending field
        field: String,
        /// What is wrong
        message: String,
    },

    /// Stored record could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Codec message
        reason: String,
    },
}

impl SocialError {
    /// Create a forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an already exists error.
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    /// Create a store unavailable error.
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

impl From<StoreError> for SocialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { reason } | StoreError::Aborted { reason } => {
                Self::StoreUnavailable { reason }
            }
            StoreError::AlreadyExists { path } => Self::AlreadyExists { what: path },
            StoreError::NotFound { path } => Self::NotFound { what: path },
            StoreError::InvalidPath { reason } => Self::invalid("path", reason),
            StoreError::InvalidQuery { reason } => Self::invalid("query", reason),
            StoreError::Serialization { reason } => Self::Serialization { reason },
        }
    }
}

/// Result alias for social operations.
pub type Result<T> = std::result::Result<T, SocialError>;

#[cfg(test)]
mod tests {
    use super::*;
    use warble_core::CollectionPath;

    #[test]
    fn test_store_errors_map_onto_taxonomy() {
        let path = CollectionPath::root("follows").doc("a_b");
        assert_eq!(
            SocialError::from(StoreError::already_exists(&path)),
            SocialError::already_exists("follows/a_b")
        );
        assert!(SocialError::from(StoreError::aborted("contention")).is_retryable());
        assert!(!SocialError::EmptyPost.is_retryable());
        assert!(!SocialError::forbidden("not the author").is_retryable());
    }
}
