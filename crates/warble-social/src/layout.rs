//! Store layout
//!
//! Where every social record lives:
//!
//! | record                | path                                              |
//! |-----------------------|---------------------------------------------------|
//! | profile               | `users/{user}`                                    |
//! | reverse index entry   | `users/{user}/{likes,retweets}/{content_key}`     |
//! | follow edge           | `follows/{follower}_{followee}`                   |
//! | post                  | `posts/{post}`                                    |
//! | reply                 | `posts/{post}/replies/{reply}[/replies/{reply}]*` |
//! | membership            | `{content}/{likes,retweets}/{user}`               |
//!
//! Content nodes are addressed by [`ContentPath`]: the root post id followed
//! by the reply ids leading down to the node. Threads never need
//! object-level parent links, and depth is bounded only by the store.

use crate::error::{Result, SocialError};
use serde::{Deserialize, Serialize};
use std::fmt;
use warble_core::document::{CollectionPath, DocumentPath};
use warble_core::identifiers::{PostId, ReplyId, UserId};

/// Top-level profiles collection
pub const USERS: &str = "users";
/// Top-level posts collection
pub const POSTS: &str = "posts";
/// Top-level follow edges collection
pub const FOLLOWS: &str = "follows";
/// Reply sub-collection under any content node
pub const REPLIES: &str = "replies";

/// Field names queried by the services
pub mod fields {
    /// Post and reply author
    pub const AUTHOR: &str = "author";
    /// Server-assigned creation time
    pub const CREATED_AT: &str = "created_at";
    /// Follow edge source
    pub const FOLLOWER: &str = "follower";
    /// Follow edge target
    pub const FOLLOWEE: &str = "followee";
}

/// Separator between ids in a content key
const KEY_SEPARATOR: char = '.';

/// Address of a post or of a reply at any depth below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentPath {
    post: PostId,
    replies: Vec<ReplyId>,
}

impl ContentPath {
    /// A top-level post.
    pub fn post(post: PostId) -> Self {
        Self {
            post,
            replies: Vec::new(),
        }
    }

    /// The reply `reply` directly under this node.
    pub fn child(&self, reply: ReplyId) -> Self {
        let mut replies = self.replies.clone();
        replies.push(reply);
        Self {
            post: self.post,
            replies,
        }
    }

    /// The node this one replies to; `None` for a post.
    pub fn parent(&self) -> Option<Self> {
        let (_, ancestors) = self.replies.split_last()?;
        Some(Self {
            post: self.post,
            replies: ancestors.to_vec(),
        })
    }

    /// Root post of the thread.
    pub fn root(&self) -> PostId {
        self.post
    }

    /// Reply id of this node, `None` for a post.
    pub fn reply_id(&self) -> Option<ReplyId> {
        self.replies.last().copied()
    }

    /// True for top-level posts.
    pub fn is_post(&self) -> bool {
        self.replies.is_empty()
    }

    /// Number of reply hops below the root post.
    pub fn depth(&self) -> usize {
        self.replies.len()
    }

    /// Store document holding this node.
    pub fn document(&self) -> DocumentPath {
        let mut path = CollectionPath::root(POSTS).doc(self.post);
        for reply in &self.replies {
            path = path.collection(REPLIES).doc(reply);
        }
        path
    }

    /// Collection of direct replies.
    pub fn replies_collection(&self) -> CollectionPath {
        self.document().collection(REPLIES)
    }

    /// Flat key identifying this node in a user's reverse index.
    pub fn content_key(&self) -> String {
        let mut key = self.post.to_string();
        for reply in &self.replies {
            key.push(KEY_SEPARATOR);
            key.push_str(&reply.to_string());
        }
        key
    }

    /// Parse a key produced by [`content_key`](Self::content_key).
    pub fn from_content_key(key: &str) -> Result<Self> {
        let mut parts = key.split(KEY_SEPARATOR);
        let invalid = |e: uuid::Error| SocialError::invalid("content_key", format!("{key}: {e}"));
        let post = parts
            .next()
            .unwrap_or_default()
            .parse::<PostId>()
            .map_err(invalid)?;
        let replies = parts
            .map(|p| p.parse::<ReplyId>().map_err(invalid))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { post, replies })
    }
}

impl From<PostId> for ContentPath {
    fn from(post: PostId) -> Self {
        Self::post(post)
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.document())
    }
}

/// Profile document of `user`.
pub fn profile_document(user: UserId) -> DocumentPath {
    CollectionPath::root(USERS).doc(user)
}

/// Follow edge document for an ordered pair.
pub fn follow_document(follower: UserId, followee: UserId) -> DocumentPath {
    CollectionPath::root(FOLLOWS).doc(format!("{follower}_{followee}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn post() -> PostId {
        PostId::from_uuid(Uuid::from_u128(1))
    }

    fn reply(n: u128) -> ReplyId {
        ReplyId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn test_nested_reply_document_path() {
        let path = ContentPath::post(post()).child(reply(2)).child(reply(3));
        let doc = path.document();
        assert_eq!(doc.segments().len(), 6);
        assert_eq!(doc.segments()[2], REPLIES);
        assert_eq!(doc.id(), reply(3).to_string());
        assert_eq!(path.depth(), 2);
        assert_eq!(
            path.parent(),
            Some(ContentPath::post(post()).child(reply(2)))
        );
        assert_eq!(ContentPath::post(post()).parent(), None);
    }

    #[test]
    fn test_content_key_round_trip() {
        let path = ContentPath::post(post()).child(reply(9));
        let key = path.content_key();
        assert!(!key.contains('/'));
        assert_eq!(ContentPath::from_content_key(&key).unwrap(), path);
        assert!(ContentPath::from_content_key("not-a-uuid").is_err());
    }
}
