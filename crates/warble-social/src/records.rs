//! Stored record shapes
//!
//! Every record carries the fields the services query on (`author`,
//! `created_at`, `follower`, `followee`) at top level so store filters and
//! ordering can reach them.

use crate::error::{Result, SocialError};
use crate::layout::ContentPath;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use warble_core::document::Document;
use warble_core::identifiers::{PostId, ReplyId, UserId};
use warble_core::time::Timestamp;

/// User profile, one per identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Identity the profile belongs to
    pub id: UserId,
    /// Credential string from the identity provider
    pub email: String,
    /// Display handle, always starting with a single `@`
    pub pseudo: String,
    /// Avatar image reference
    pub avatar: String,
    /// Free text, bounded by `SocialConfig::max_bio_chars`
    #[serde(default)]
    pub bio: String,
    /// Birthdate as entered by the user
    #[serde(default)]
    pub birthdate: Option<String>,
    /// Cover image reference
    #[serde(default)]
    pub cover: String,
    /// When the profile was created
    pub created_at: Timestamp,
}

/// Owner-supplied profile changes; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New handle (normalized before storing)
    pub pseudo: Option<String>,
    /// New avatar reference
    pub avatar: Option<String>,
    /// New bio
    pub bio: Option<String>,
    /// New birthdate
    pub birthdate: Option<String>,
    /// New cover reference
    pub cover: Option<String>,
}

/// Media attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Uploaded image reference
    #[serde(default)]
    pub image: Option<String>,
    /// Animated gif reference
    #[serde(default)]
    pub gif: Option<String>,
}

impl Media {
    /// Media with an image.
    pub fn image(reference: impl Into<String>) -> Self {
        Self {
            image: Some(reference.into()),
            gif: None,
        }
    }

    /// Media with a gif.
    pub fn gif(reference: impl Into<String>) -> Self {
        Self {
            image: None,
            gif: Some(reference.into()),
        }
    }

    /// True when no non-blank reference is attached.
    pub fn is_empty(&self) -> bool {
        let blank = |r: &Option<String>| r.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.image) && blank(&self.gif)
    }
}

/// Top-level post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post id
    pub id: PostId,
    /// Author; never changes after creation
    pub author: UserId,
    /// Text, possibly empty when media is attached
    pub content: String,
    /// Attached media
    #[serde(default)]
    pub media: Media,
    /// Server-assigned creation time
    pub created_at: Timestamp,
}

impl Post {
    /// Address of this post.
    pub fn path(&self) -> ContentPath {
        ContentPath::post(self.id)
    }
}

/// Reply under a post or another reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Reply id
    pub id: ReplyId,
    /// Node this reply answers
    pub parent: ContentPath,
    /// Author; never changes after creation
    pub author: UserId,
    /// Text
    pub content: String,
    /// Server-assigned creation time
    pub created_at: Timestamp,
}

impl Reply {
    /// Address of this reply.
    pub fn path(&self) -> ContentPath {
        self.parent.child(self.id)
    }
}

/// Directed follow edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    /// Who follows
    pub follower: UserId,
    /// Who is followed
    pub followee: UserId,
    /// When the edge was created
    pub created_at: Timestamp,
}

/// Entry in a like or retweet membership set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Member
    pub user: UserId,
    /// When the membership was added
    pub created_at: Timestamp,
}

/// Reverse index entry pointing from a user back at engaged content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseIndexEntry {
    /// Engaged content
    pub target: ContentPath,
    /// When the engagement happened
    pub created_at: Timestamp,
}

/// Decode every document in a result set.
pub(crate) fn decode_all<T: DeserializeOwned>(documents: &[Document]) -> Result<Vec<T>> {
    documents
        .iter()
        .map(|doc| doc.decode::<T>().map_err(SocialError::from))
        .collect()
}
