//! Social Graph Manager
//!
//! Directed follow edges stored one document per ordered pair at
//! `follows/{follower}_{followee}`. Because the id is derived from the pair,
//! "at most one edge" is enforced by the store's create precondition rather
//! than by a read-then-write check that two racing requests could both pass.

use crate::config::SocialConfig;
use crate::error::{Result, SocialError};
use crate::layout::{fields, follow_document, FOLLOWS};
use crate::profile::ProfileStore;
use crate::records::{decode_all, FollowEdge, Profile};
use crate::store;
use futures::future::join_all;
use std::sync::Arc;
use warble_core::document::{CollectionPath, Direction, Document, Query, WriteBatch};
use warble_core::effects::{to_document_value, DocumentStoreEffects, QuerySubscription};
use warble_core::identifiers::UserId;

/// Edges leaving `follower`, oldest first.
pub(crate) fn following_query(follower: UserId) -> Query {
    Query::collection(CollectionPath::root(FOLLOWS))
        .filter_eq(fields::FOLLOWER, follower.to_string())
        .order_by(fields::CREATED_AT, Direction::Ascending)
}

/// Edges arriving at `followee`, oldest first.
pub(crate) fn followers_query(followee: UserId) -> Query {
    Query::collection(CollectionPath::root(FOLLOWS))
        .filter_eq(fields::FOLLOWEE, followee.to_string())
        .order_by(fields::CREATED_AT, Direction::Ascending)
}

/// Follow graph operations
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    config: Arc<SocialConfig>,
    profiles: ProfileStore,
}

impl SocialGraph {
    /// Create a graph manager
    pub fn new(config: Arc<SocialConfig>) -> Self {
        Self {
            profiles: ProfileStore::new(config.clone()),
            config,
        }
    }

    /// Create the edge `follower -> followee`.
    ///
    /// Fails with `AlreadyExists` when the edge is present and `Invalid` for
    /// a self-follow.
    pub async fn follow<E>(
        &self,
        effects: &E,
        follower: UserId,
        followee: UserId,
    ) -> Result<FollowEdge>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        if follower == followee {
            return Err(SocialError::invalid("followee", "users cannot follow themselves"));
        }

        let edge = FollowEdge {
            follower,
            followee,
            created_at: store::timestamp(effects, &self.config.retry).await?,
        };
        let batch = WriteBatch::new().create(
            follow_document(follower, followee),
            to_document_value(&edge)?,
        );

        store::commit(effects, &self.config.retry, "follow", batch)
            .await
            .map_err(|err| match err {
                SocialError::AlreadyExists { .. } => {
                    SocialError::already_exists(format!("{follower} already follows {followee}"))
                }
                other => other,
            })?;

        tracing::debug!(%follower, %followee, "follow edge created");
        Ok(edge)
    }

    /// Remove the edge `follower -> followee`; `NotFound` when absent.
    pub async fn unfollow<E>(&self, effects: &E, follower: UserId, followee: UserId) -> Result<()>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let batch = WriteBatch::new().delete_existing(follow_document(follower, followee));
        store::commit(effects, &self.config.retry, "unfollow", batch)
            .await
            .map_err(|err| match err {
                SocialError::NotFound { .. } => {
                    SocialError::not_found(format!("{follower} does not follow {followee}"))
                }
                other => other,
            })?;

        tracing::debug!(%follower, %followee, "follow edge removed");
        Ok(())
    }

    /// Whether the edge `follower -> followee` exists.
    pub async fn is_following<E>(
        &self,
        effects: &E,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let path = follow_document(follower, followee);
        Ok(store::get(effects, &self.config.retry, &path)
            .await?
            .is_some())
    }

    /// Profiles of everyone following `user`.
    ///
    /// Edges whose follower has no profile are skipped.
    pub async fn list_followers<E>(&self, effects: &E, user: UserId) -> Result<Vec<Profile>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let edges = self.edges(effects, &followers_query(user)).await?;
        self.resolve(effects, edges.iter().map(|e| e.follower)).await
    }

    /// Profiles of everyone `user` follows.
    ///
    /// Edges whose followee has no profile are skipped.
    pub async fn list_following<E>(&self, effects: &E, user: UserId) -> Result<Vec<Profile>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let ids = self.following_ids(effects, user).await?;
        self.resolve(effects, ids.into_iter()).await
    }

    /// Identities `user` follows, in follow order.
    pub async fn following_ids<E>(&self, effects: &E, user: UserId) -> Result<Vec<UserId>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let edges = self.edges(effects, &following_query(user)).await?;
        Ok(edges.into_iter().map(|e| e.followee).collect())
    }

    /// Number of followers of `user`.
    pub async fn follower_count<E>(&self, effects: &E, user: UserId) -> Result<usize>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        store::count(effects, &self.config.retry, &followers_query(user)).await
    }

    /// Number of users `user` follows.
    pub async fn following_count<E>(&self, effects: &E, user: UserId) -> Result<usize>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        store::count(effects, &self.config.retry, &following_query(user)).await
    }

    /// Live view of the edges leaving `user`.
    pub async fn watch_following<E>(&self, effects: &E, user: UserId) -> Result<QuerySubscription>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        store::subscribe(effects, &self.config.retry, following_query(user)).await
    }

    /// Live view of the edges arriving at `user`.
    pub async fn watch_followers<E>(&self, effects: &E, user: UserId) -> Result<QuerySubscription>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        store::subscribe(effects, &self.config.retry, followers_query(user)).await
    }

    async fn edges<E>(&self, effects: &E, query: &Query) -> Result<Vec<FollowEdge>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        decode_all(&store::query(effects, &self.config.retry, query).await?)
    }

    async fn resolve<E, I>(&self, effects: &E, users: I) -> Result<Vec<Profile>>
    where
        E: DocumentStoreEffects + ?Sized,
        I: Iterator<Item = UserId>,
    {
        let lookups = users.map(|user| self.profiles.find_profile(effects, user));
        let mut profiles = Vec::new();
        for found in join_all(lookups).await {
            match found? {
                Some(profile) => profiles.push(profile),
                None => tracing::warn!("follow edge references a missing profile"),
            }
        }
        Ok(profiles)
    }
}

/// Decode the followee ids out of a following snapshot.
pub(crate) fn followees(documents: &[Document]) -> Result<Vec<UserId>> {
    let edges: Vec<FollowEdge> = decode_all(documents)?;
    Ok(edges.into_iter().map(|e| e.followee).collect())
}
