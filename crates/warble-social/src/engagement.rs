//! Engagement Aggregator
//!
//! Likes and retweets are two independent instances of one state machine:
//! a membership set per content node plus a per-user reverse index. The
//! forward record and its reverse entry always change in the same atomic
//! batch, so neither can exist without the other.

use crate::config::SocialConfig;
use crate::error::{Result, SocialError};
use crate::layout::{fields, profile_document, ContentPath};
use crate::records::{decode_all, Membership, ReverseIndexEntry};
use crate::store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use warble_core::document::{CollectionPath, Direction, Document, DocumentPath, Query, WriteBatch};
use warble_core::effects::{to_document_value, DocumentStoreEffects, QuerySubscription};
use warble_core::identifiers::UserId;

/// Which membership set an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    /// Like
    Like,
    /// Retweet
    Retweet,
}

impl EngagementKind {
    /// Both kinds.
    pub const ALL: [Self; 2] = [Self::Like, Self::Retweet];

    /// Collection name used both under content and under the user.
    pub fn collection_name(self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::Retweet => "retweets",
        }
    }

    /// Membership collection of `target`.
    pub fn members(self, target: &ContentPath) -> CollectionPath {
        target.document().collection(self.collection_name())
    }

    /// Membership record of `user` on `target`.
    pub fn member_document(self, target: &ContentPath, user: UserId) -> DocumentPath {
        self.members(target).doc(user)
    }

    /// Reverse index collection of `user`.
    pub fn reverse_index(self, user: UserId) -> CollectionPath {
        profile_document(user).collection(self.collection_name())
    }

    /// Reverse index entry of `user` for `target`.
    pub fn reverse_document(self, user: UserId, target: &ContentPath) -> DocumentPath {
        self.reverse_index(user).doc(target.content_key())
    }
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Retweet => f.write_str("retweet"),
        }
    }
}

/// Result of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    /// Kind that was toggled
    pub kind: EngagementKind,
    /// Whether the actor is a member after the toggle
    pub active: bool,
    /// Set size after the toggle
    pub count: usize,
}

/// Engagement counters for one content node, from one viewer's side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSummary {
    /// Like count
    pub likes: usize,
    /// Retweet count
    pub retweets: usize,
    /// Direct reply count
    pub replies: usize,
    /// Viewer liked it
    pub liked: bool,
    /// Viewer retweeted it
    pub retweeted: bool,
}

/// Like and retweet operations
#[derive(Debug, Clone, Default)]
pub struct EngagementAggregator {
    config: Arc<SocialConfig>,
}

impl EngagementAggregator {
    /// Create an aggregator
    pub fn new(config: Arc<SocialConfig>) -> Self {
        Self { config }
    }

    /// Flip `actor`'s membership in the `kind` set of `target`.
    ///
    /// If a concurrent toggle by the same actor wins the race, the batch
    /// precondition fails; the membership is then re-read and reported as it
    /// stands, since the other request already moved it to the state this
    /// one was aiming for.
    pub async fn toggle<E>(
        &self,
        effects: &E,
        kind: EngagementKind,
        actor: UserId,
        target: &ContentPath,
    ) -> Result<ToggleOutcome>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let retry = &self.config.retry;
        if store::get(effects, retry, &target.document()).await?.is_none() {
            return Err(SocialError::not_found(format!("content {target}")));
        }

        let member = kind.member_document(target, actor);
        let reverse = kind.reverse_document(actor, target);
        let was_member = store::get(effects, retry, &member).await?.is_some();

        let batch = if was_member {
            WriteBatch::new().delete_existing(member).delete(reverse)
        } else {
            let created_at = store::timestamp(effects, retry).await?;
            let membership = Membership {
                user: actor,
                created_at,
            };
            let entry = ReverseIndexEntry {
                target: target.clone(),
                created_at,
            };
            WriteBatch::new()
                .create(member, to_document_value(&membership)?)
                .set(reverse, to_document_value(&entry)?)
        };

        let active = match store::commit(effects, retry, "toggle", batch).await {
            Ok(()) => !was_member,
            Err(SocialError::AlreadyExists { .. } | SocialError::NotFound { .. }) => {
                tracing::debug!(%actor, content = %target, %kind, "toggle lost a race, re-reading");
                self.has_member(effects, kind, target, actor).await?
            }
            Err(err) => return Err(err),
        };

        let count = self.get_count(effects, kind, target).await?;
        tracing::debug!(%actor, content = %target, %kind, active, count, "engagement toggled");
        Ok(ToggleOutcome {
            kind,
            active,
            count,
        })
    }

    /// Size of the `kind` set of `target`.
    pub async fn get_count<E>(
        &self,
        effects: &E,
        kind: EngagementKind,
        target: &ContentPath,
    ) -> Result<usize>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let query = Query::collection(kind.members(target));
        store::count(effects, &self.config.retry, &query).await
    }

    /// Whether `user` is in the `kind` set of `target`.
    pub async fn has_member<E>(
        &self,
        effects: &E,
        kind: EngagementKind,
        target: &ContentPath,
        user: UserId,
    ) -> Result<bool>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let path = kind.member_document(target, user);
        Ok(store::get(effects, &self.config.retry, &path)
            .await?
            .is_some())
    }

    /// Members of the `kind` set of `target`, oldest first.
    pub async fn members<E>(
        &self,
        effects: &E,
        kind: EngagementKind,
        target: &ContentPath,
    ) -> Result<Vec<UserId>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let query = Query::collection(kind.members(target))
            .order_by(fields::CREATED_AT, Direction::Ascending);
        let records: Vec<Membership> =
            decode_all(&store::query(effects, &self.config.retry, &query).await?)?;
        Ok(records.into_iter().map(|m| m.user).collect())
    }

    /// Counters and viewer flags for `target`.
    pub async fn summary<E>(
        &self,
        effects: &E,
        target: &ContentPath,
        viewer: Option<UserId>,
    ) -> Result<EngagementSummary>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let replies_query = Query::collection(target.replies_collection());
        let (likes, retweets, replies) = futures::try_join!(
            self.get_count(effects, EngagementKind::Like, target),
            self.get_count(effects, EngagementKind::Retweet, target),
            store::count(effects, &self.config.retry, &replies_query),
        )?;

        let (liked, retweeted) = match viewer {
            Some(viewer) => futures::try_join!(
                self.has_member(effects, EngagementKind::Like, target, viewer),
                self.has_member(effects, EngagementKind::Retweet, target, viewer),
            )?,
            None => (false, false),
        };

        Ok(EngagementSummary {
            likes,
            retweets,
            replies,
            liked,
            retweeted,
        })
    }

    /// Live view of the `kind` set of `target`.
    pub async fn watch<E>(
        &self,
        effects: &E,
        kind: EngagementKind,
        target: &ContentPath,
    ) -> Result<QuerySubscription>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let query = Query::collection(kind.members(target));
        store::subscribe(effects, &self.config.retry, query).await
    }
}

/// Decode the member ids out of a membership snapshot.
pub fn members_of(documents: &[Document]) -> Result<Vec<UserId>> {
    let records: Vec<Membership> = decode_all(documents)?;
    Ok(records.into_iter().map(|m| m.user).collect())
}
