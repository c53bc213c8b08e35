//! Feed Composer
//!
//! Two modes over the same posts collection, both newest first:
//!
//! - [`FeedMode::Global`]: every post.
//! - [`FeedMode::FollowingOnly`]: the viewer's own posts and the posts of
//!   everyone they follow. With zero follows the feed is empty, unless
//!   `feed.own_posts_without_follows` is set, in which case it holds the
//!   viewer's own posts.
//!
//! Reads are paginated with [`PageRequest`] / [`FeedPage`]. Switching mode is
//! just a different query; it never touches stored state.

use crate::config::SocialConfig;
use crate::error::{Result, SocialError};
use crate::graph::{followees, following_query, SocialGraph};
use crate::layout::{fields, POSTS};
use crate::records::{decode_all, Post};
use crate::store;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use warble_core::document::{CollectionPath, Cursor, Direction, Query};
use warble_core::effects::{DocumentStoreEffects, QuerySnapshot, QuerySubscription};
use warble_core::identifiers::{PostId, UserId};
use warble_core::reliability::RetryPolicy;
use warble_core::time::Timestamp;

/// Which posts a feed shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Every post
    #[default]
    Global,
    /// Own posts plus posts of followed users
    FollowingOnly,
}

/// Position after the last post of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    /// Creation time of the last post seen
    pub created_at: Timestamp,
    /// Id of the last post seen
    pub post: PostId,
}

impl FeedCursor {
    /// Cursor positioned on `post`.
    pub fn after(post: &Post) -> Self {
        Self {
            created_at: post.created_at,
            post: post.id,
        }
    }

    fn to_store_cursor(self) -> Cursor {
        Cursor {
            value: Value::from(self.created_at.as_millis()),
            document_id: self.post.to_string(),
        }
    }
}

/// Which page to read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page size; the configured default when `None`, clamped to the maximum
    pub limit: Option<usize>,
    /// Resume after this position; first page when `None`
    pub after: Option<FeedCursor>,
}

impl PageRequest {
    /// First page at the default size.
    pub fn first() -> Self {
        Self::default()
    }

    /// First page of `limit` posts.
    pub fn first_n(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            after: None,
        }
    }

    /// Page following `cursor`, same size as this request.
    pub fn next(self, cursor: FeedCursor) -> Self {
        Self {
            limit: self.limit,
            after: Some(cursor),
        }
    }
}

/// One page of a feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    /// Posts, newest first
    pub posts: Vec<Post>,
    /// Where the next page starts; `None` once the feed is exhausted
    pub next_cursor: Option<FeedCursor>,
}

impl FeedPage {
    /// True when the page holds no posts.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Authors of a following-only feed, viewer first.
pub(crate) fn following_feed_authors(
    viewer: UserId,
    following: Vec<UserId>,
    own_posts_without_follows: bool,
) -> Vec<UserId> {
    if following.is_empty() && !own_posts_without_follows {
        return Vec::new();
    }
    let mut authors = Vec::with_capacity(following.len() + 1);
    authors.push(viewer);
    for user in following {
        if !authors.contains(&user) {
            authors.push(user);
        }
    }
    authors
}

/// Posts query, newest first. `authors: None` means every author; `None` is
/// returned when the author set is empty and no post can match.
pub(crate) fn posts_query(
    authors: Option<&[UserId]>,
    limit: usize,
    after: Option<FeedCursor>,
) -> Option<Query> {
    let mut query = Query::collection(CollectionPath::root(POSTS))
        .order_by(fields::CREATED_AT, Direction::Descending)
        .limit(limit);
    if let Some(authors) = authors {
        if authors.is_empty() {
            return None;
        }
        let values = authors.iter().map(|a| Value::from(a.to_string())).collect();
        query = query.filter_in(fields::AUTHOR, values);
    }
    if let Some(cursor) = after {
        query = query.start_after(cursor.to_store_cursor());
    }
    Some(query)
}

/// Read one page of posts by `authors` (every author when `None`).
pub(crate) async fn page_of_posts<E>(
    effects: &E,
    retry: &RetryPolicy,
    authors: Option<&[UserId]>,
    limit: usize,
    after: Option<FeedCursor>,
) -> Result<FeedPage>
where
    E: DocumentStoreEffects + ?Sized,
{
    let Some(query) = posts_query(authors, limit, after) else {
        return Ok(FeedPage::default());
    };
    let posts: Vec<Post> = decode_all(&store::query(effects, retry, &query).await?)?;
    let next_cursor = if posts.len() == limit {
        posts.last().map(FeedCursor::after)
    } else {
        None
    };
    Ok(FeedPage { posts, next_cursor })
}

/// Feed reads
#[derive(Debug, Clone, Default)]
pub struct FeedComposer {
    config: Arc<SocialConfig>,
    graph: SocialGraph,
}

impl FeedComposer {
    /// Create a composer
    pub fn new(config: Arc<SocialConfig>) -> Self {
        Self {
            graph: SocialGraph::new(config.clone()),
            config,
        }
    }

    /// One page of `viewer`'s feed in `mode`.
    pub async fn compose<E>(
        &self,
        effects: &E,
        viewer: UserId,
        mode: FeedMode,
        page: PageRequest,
    ) -> Result<FeedPage>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let limit = self.config.feed.page_size(page.limit);
        let authors = self.feed_authors(effects, viewer, mode).await?;
        let page = page_of_posts(
            effects,
            &self.config.retry,
            authors.as_deref(),
            limit,
            page.after,
        )
        .await?;
        tracing::debug!(%viewer, ?mode, posts = page.posts.len(), "feed composed");
        Ok(page)
    }

    /// Authors visible in `mode`; `None` means everyone.
    pub async fn feed_authors<E>(
        &self,
        effects: &E,
        viewer: UserId,
        mode: FeedMode,
    ) -> Result<Option<Vec<UserId>>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        match mode {
            FeedMode::Global => Ok(None),
            FeedMode::FollowingOnly => {
                let following = self.graph.following_ids(effects, viewer).await?;
                Ok(Some(following_feed_authors(
                    viewer,
                    following,
                    self.config.feed.own_posts_without_follows,
                )))
            }
        }
    }

    /// Live first page of `viewer`'s feed.
    pub fn watch<E>(
        &self,
        effects: E,
        viewer: UserId,
        mode: FeedMode,
        limit: Option<usize>,
    ) -> FeedWatcher<E>
    where
        E: DocumentStoreEffects,
    {
        FeedWatcher {
            effects,
            viewer,
            mode,
            limit: self.config.feed.page_size(limit),
            own_posts_without_follows: self.config.feed.own_posts_without_follows,
            retry: self.config.retry.clone(),
            follows: None,
            authors: None,
            posts: None,
            idle: false,
            failures: 0,
        }
    }
}

enum Event {
    Follows(Option<QuerySnapshot>),
    Posts(Option<QuerySnapshot>),
}

async fn next_snapshot(subscription: Option<&mut QuerySubscription>) -> Option<QuerySnapshot> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

fn closed(what: &str) -> SocialError {
    SocialError::store_unavailable(format!("{what} subscription closed"))
}

/// Realtime first page of a feed.
///
/// Holds a subscription on the posts query and, in following-only mode, on
/// the viewer's follow edges; a change in the follow set rebuilds the posts
/// query. When a subscription cannot be established or is closed by the
/// store, [`next`](Self::next) yields an empty feed and the following call
/// re-subscribes after a backoff delay. Dropping the watcher releases both
/// subscriptions.
pub struct FeedWatcher<E> {
    effects: E,
    viewer: UserId,
    mode: FeedMode,
    limit: usize,
    own_posts_without_follows: bool,
    retry: RetryPolicy,
    follows: Option<QuerySubscription>,
    authors: Option<Vec<UserId>>,
    posts: Option<QuerySubscription>,
    /// Following-only feed with nobody to show; waiting on follows alone
    idle: bool,
    failures: u32,
}

impl<E: DocumentStoreEffects> FeedWatcher<E> {
    /// Viewer this feed belongs to
    pub fn viewer(&self) -> UserId {
        self.viewer
    }

    /// Mode of this feed
    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    /// Consecutive failed attempts to (re)subscribe
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Wait for the next version of the feed.
    ///
    /// The first call returns the current feed immediately.
    pub async fn next(&mut self) -> Vec<Post> {
        loop {
            if self.failures > 0 {
                let delay: Duration = self.retry.calculate_delay(self.failures - 1);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            match self.step().await {
                Ok(Some(posts)) => return posts,
                Ok(None) => continue,
                Err(err) => {
                    self.failures = self.failures.saturating_add(1);
                    tracing::warn!(
                        viewer = %self.viewer,
                        failures = self.failures,
                        error = %err,
                        "feed subscription failed, serving empty feed"
                    );
                    self.reset();
                    return Vec::new();
                }
            }
        }
    }

    fn reset(&mut self) {
        self.follows = None;
        self.authors = None;
        self.posts = None;
        self.idle = false;
    }

    /// Establish missing subscriptions, then wait for one change.
    /// `Ok(None)` means nothing visible changed.
    async fn step(&mut self) -> Result<Option<Vec<Post>>> {
        if self.mode == FeedMode::FollowingOnly && self.follows.is_none() {
            let mut follows = self.effects.subscribe(following_query(self.viewer)).await?;
            let initial = follows.next().await.ok_or_else(|| closed("follow"))?;
            self.set_authors(followees(&initial.documents)?);
            self.follows = Some(follows);
        }

        if self.posts.is_none() && !self.idle {
            match posts_query(self.authors.as_deref(), self.limit, None) {
                Some(query) => self.posts = Some(self.effects.subscribe(query).await?),
                None => {
                    self.idle = true;
                    self.failures = 0;
                    return Ok(Some(Vec::new()));
                }
            }
        }
        self.failures = 0;

        let event = tokio::select! {
            snapshot = next_snapshot(self.follows.as_mut()) => Event::Follows(snapshot),
            snapshot = next_snapshot(self.posts.as_mut()) => Event::Posts(snapshot),
        };

        match event {
            Event::Follows(snapshot) => {
                let snapshot = snapshot.ok_or_else(|| closed("follow"))?;
                let previous = self.authors.clone();
                self.set_authors(followees(&snapshot.documents)?);
                if self.authors != previous {
                    tracing::debug!(viewer = %self.viewer, "follow set changed, rebuilding feed");
                    self.posts = None;
                    self.idle = false;
                }
                Ok(None)
            }
            Event::Posts(snapshot) => {
                let snapshot = snapshot.ok_or_else(|| closed("posts"))?;
                Ok(Some(decode_all(&snapshot.documents)?))
            }
        }
    }

    fn set_authors(&mut self, following: Vec<UserId>) {
        self.authors = Some(following_feed_authors(
            self.viewer,
            following,
            self.own_posts_without_follows,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(n: u128) -> UserId {
        UserId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn test_following_authors_empty_without_follows() {
        assert!(following_feed_authors(user(1), vec![], false).is_empty());
        assert_eq!(following_feed_authors(user(1), vec![], true), vec![user(1)]);
        assert_eq!(
            following_feed_authors(user(1), vec![user(2), user(1), user(2)], false),
            vec![user(1), user(2)]
        );
    }

    #[test]
    fn test_posts_query_shapes() {
        assert!(posts_query(Some(&[][..]), 10, None).is_none());

        let global = posts_query(None, 10, None).unwrap();
        assert!(global.filters.is_empty());
        assert_eq!(global.limit, Some(10));

        let cursor = FeedCursor {
            created_at: Timestamp::from_millis(5),
            post: PostId::from_uuid(Uuid::from_u128(3)),
        };
        let filtered = posts_query(Some(&[user(1)][..]), 10, Some(cursor)).unwrap();
        assert_eq!(filtered.filters.len(), 1);
        assert_eq!(
            filtered.start_after.map(|c| c.value),
            Some(Value::from(5u64))
        );
    }
}
