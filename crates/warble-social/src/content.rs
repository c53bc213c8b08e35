//! Content Store
//!
//! Posts and their reply trees. A reply tree is never materialized as a
//! whole: [`ContentStore::get_thread`] returns one level, and callers descend
//! by asking for the thread of a reply.
//!
//! # Cascading delete
//!
//! Deleting a node removes, in one atomic batch, the node itself, every
//! descendant reply, every like/retweet record under any of them and the
//! matching reverse index entries of the members. Records written under the
//! subtree while that batch was being assembled are removed by up to
//! `cascade.max_sweeps` follow-up passes; once the call returns the subtree
//! is empty unless writers are still racing the final sweep.

use crate::config::SocialConfig;
use crate::engagement::EngagementKind;
use crate::error::{Result, SocialError};
use crate::layout::{fields, ContentPath};
use crate::records::{decode_all, Media, Membership, Post, Reply};
use crate::store;
use std::sync::Arc;
use warble_core::document::{Direction, Document, DocumentPath, Query, WriteBatch};
use warble_core::effects::{
    to_document_value, DocumentStoreEffects, QuerySubscription, RandomEffects,
};
use warble_core::identifiers::{PostId, ReplyId, UserId};

/// What a cascading delete removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Documents removed, the node itself included
    pub removed: usize,
    /// Follow-up passes that found stragglers
    pub sweeps: u32,
}

/// Post and reply operations
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    config: Arc<SocialConfig>,
}

impl ContentStore {
    /// Create a content store
    pub fn new(config: Arc<SocialConfig>) -> Self {
        Self { config }
    }

    /// Publish a post.
    ///
    /// Text may be blank only when media is attached; otherwise the call
    /// fails with `EmptyPost`.
    pub async fn create_post<E>(
        &self,
        effects: &E,
        author: UserId,
        content: &str,
        media: Option<Media>,
    ) -> Result<Post>
    where
        E: DocumentStoreEffects + RandomEffects + ?Sized,
    {
        let media = media.unwrap_or_default();
        if content.trim().is_empty() && media.is_empty() {
            return Err(SocialError::EmptyPost);
        }

        let post = Post {
            id: PostId::from_uuid(effects.random_uuid().await),
            author,
            content: content.to_string(),
            media,
            created_at: store::timestamp(effects, &self.config.retry).await?,
        };

        let batch = WriteBatch::new().create(post.path().document(), to_document_value(&post)?);
        store::commit(effects, &self.config.retry, "create_post", batch).await?;

        tracing::debug!(post = %post.id, %author, "post created");
        Ok(post)
    }

    /// Delete a post and everything under it. Only the author may do this.
    pub async fn delete_post<E>(
        &self,
        effects: &E,
        actor: UserId,
        post: PostId,
    ) -> Result<CascadeReport>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let existing = self.get_post(effects, post).await?;
        if existing.author != actor {
            return Err(SocialError::forbidden("only the author may delete a post"));
        }
        self.cascade_delete(effects, &existing.path()).await
    }

    /// Reply to a post or to another reply.
    pub async fn create_reply<E>(
        &self,
        effects: &E,
        author: UserId,
        parent: &ContentPath,
        content: &str,
    ) -> Result<Reply>
    where
        E: DocumentStoreEffects + RandomEffects + ?Sized,
    {
        if content.trim().is_empty() {
            return Err(SocialError::EmptyReply);
        }
        self.require(effects, parent).await?;

        let reply = Reply {
            id: ReplyId::from_uuid(effects.random_uuid().await),
            parent: parent.clone(),
            author,
            content: content.to_string(),
            created_at: store::timestamp(effects, &self.config.retry).await?,
        };

        let batch =
            WriteBatch::new().create(reply.path().document(), to_document_value(&reply)?);
        store::commit(effects, &self.config.retry, "create_reply", batch).await?;

        tracing::debug!(reply = %reply.path(), %author, depth = reply.path().depth(), "reply created");
        Ok(reply)
    }

    /// Delete a reply and everything under it. Only the author may do this.
    pub async fn delete_reply<E>(
        &self,
        effects: &E,
        actor: UserId,
        reply: &ContentPath,
    ) -> Result<CascadeReport>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let existing = self.get_reply(effects, reply).await?;
        if existing.author != actor {
            return Err(SocialError::forbidden("only the author may delete a reply"));
        }
        self.cascade_delete(effects, reply).await
    }

    /// Load a post.
    pub async fn get_post<E>(&self, effects: &E, post: PostId) -> Result<Post>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let path = ContentPath::post(post);
        let doc = self.require(effects, &path).await?;
        Ok(doc.decode()?)
    }

    /// Load a reply.
    pub async fn get_reply<E>(&self, effects: &E, reply: &ContentPath) -> Result<Reply>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        if reply.is_post() {
            return Err(SocialError::invalid("reply", format!("{reply} is a post")));
        }
        let doc = self.require(effects, reply).await?;
        Ok(doc.decode()?)
    }

    /// Direct replies of `root`, oldest first. `NotFound` if `root` is gone.
    pub async fn get_thread<E>(&self, effects: &E, root: &ContentPath) -> Result<Vec<Reply>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        self.require(effects, root).await?;
        let docs = store::query(effects, &self.config.retry, &thread_query(root)).await?;
        decode_all(&docs)
    }

    /// Live view of the direct replies of `root`.
    pub async fn subscribe_thread<E>(
        &self,
        effects: &E,
        root: &ContentPath,
    ) -> Result<QuerySubscription>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        self.require(effects, root).await?;
        store::subscribe(effects, &self.config.retry, thread_query(root)).await
    }

    /// Number of direct replies of `target`.
    pub async fn reply_count<E>(&self, effects: &E, target: &ContentPath) -> Result<usize>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let query = Query::collection(target.replies_collection());
        store::count(effects, &self.config.retry, &query).await
    }

    async fn require<E>(
        &self,
        effects: &E,
        path: &ContentPath,
    ) -> Result<Document>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        store::get(effects, &self.config.retry, &path.document())
            .await?
            .ok_or_else(|| SocialError::not_found(format!("content {path}")))
    }

    async fn cascade_delete<E>(&self, effects: &E, root: &ContentPath) -> Result<CascadeReport>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let retry = &self.config.retry;
        let subtree = self.collect_subtree(effects, root).await?;
        let mut report = CascadeReport {
            removed: subtree.len() + 1,
            sweeps: 0,
        };

        let mut batch = WriteBatch::new().delete_existing(root.document());
        for path in subtree {
            batch = batch.delete(path);
        }
        store::commit(effects, retry, "cascade_delete", batch).await?;

        for _ in 0..self.config.cascade.max_sweeps {
            let stragglers = self.collect_subtree(effects, root).await?;
            if stragglers.is_empty() {
                break;
            }
            tracing::warn!(%root, count = stragglers.len(), "removing records written during delete");
            report.removed += stragglers.len();
            report.sweeps += 1;
            let batch = stragglers
                .into_iter()
                .fold(WriteBatch::new(), WriteBatch::delete);
            store::commit(effects, retry, "cascade_sweep", batch).await?;
        }

        tracing::debug!(%root, removed = report.removed, sweeps = report.sweeps, "content deleted");
        Ok(report)
    }

    /// Every document below `root` (not `root` itself): replies at any depth,
    /// their membership records and the members' reverse index entries.
    async fn collect_subtree<E>(&self, effects: &E, root: &ContentPath) -> Result<Vec<DocumentPath>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let retry = &self.config.retry;
        let mut paths = Vec::new();
        let mut pending = vec![root.clone()];

        while let Some(node) = pending.pop() {
            for kind in EngagementKind::ALL {
                let members =
                    store::query(effects, retry, &Query::collection(kind.members(&node))).await?;
                for doc in members {
                    let membership: Membership = doc.decode()?;
                    paths.push(kind.reverse_document(membership.user, &node));
                    paths.push(doc.path);
                }
            }

            let replies =
                store::query(effects, retry, &Query::collection(node.replies_collection()))
                    .await?;
            for doc in replies {
                let reply: Reply = doc.decode()?;
                pending.push(node.child(reply.id));
                paths.push(doc.path);
            }
        }

        Ok(paths)
    }
}

fn thread_query(root: &ContentPath) -> Query {
    Query::collection(root.replies_collection()).order_by(fields::CREATED_AT, Direction::Ascending)
}
