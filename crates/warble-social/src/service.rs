//! Social service facade
//!
//! One value bundling the five components over a shared configuration.
//! The acting user is always passed explicitly as `viewer`; nothing here
//! remembers who is signed in.

use crate::config::SocialConfig;
use crate::content::{CascadeReport, ContentStore};
use crate::engagement::{EngagementAggregator, EngagementKind, EngagementSummary, ToggleOutcome};
use crate::error::Result;
use crate::feed::{FeedComposer, FeedMode, FeedPage, FeedWatcher, PageRequest};
use crate::graph::SocialGraph;
use crate::layout::ContentPath;
use crate::profile::ProfileStore;
use crate::records::{FollowEdge, Media, Post, Profile, Reply};
use crate::SocialEffects;
use std::sync::Arc;
use warble_core::config::{ConfigError, WarbleConfig};
use warble_core::effects::DocumentStoreEffects;
use warble_core::identifiers::UserId;

/// Entry point for social operations
///
/// Stateless apart from configuration; effects are passed per call.
///
/// # Example
///
/// ```ignore
/// let social = SocialService::new(SocialConfig::default());
/// let alice = social.sign_in(&effects, alice_id, "alice@example.com", None).await?;
/// social.follow(&effects, alice_id, bob_id).await?;
/// let page = social.feed(&effects, alice_id, FeedMode::FollowingOnly, PageRequest::first()).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SocialService {
    config: Arc<SocialConfig>,
    profiles: ProfileStore,
    graph: SocialGraph,
    content: ContentStore,
    engagement: EngagementAggregator,
    feed: FeedComposer,
}

impl SocialService {
    /// Create the service without validating `config`
    pub fn new(config: SocialConfig) -> Self {
        let config = Arc::new(config);
        Self {
            profiles: ProfileStore::new(config.clone()),
            graph: SocialGraph::new(config.clone()),
            content: ContentStore::new(config.clone()),
            engagement: EngagementAggregator::new(config.clone()),
            feed: FeedComposer::new(config.clone()),
            config,
        }
    }

    /// Create the service after validating `config`
    pub fn try_new(config: SocialConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Active configuration
    pub fn config(&self) -> &SocialConfig {
        &self.config
    }

    /// Profile store
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Social graph manager
    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    /// Content store
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Engagement aggregator
    pub fn engagement(&self) -> &EngagementAggregator {
        &self.engagement
    }

    /// Feed composer
    pub fn feeds(&self) -> &FeedComposer {
        &self.feed
    }

    /// Profile for a freshly authenticated identity (created if missing)
    pub async fn sign_in<E>(
        &self,
        effects: &E,
        viewer: UserId,
        email: &str,
        pseudo: Option<&str>,
    ) -> Result<Profile>
    where
        E: SocialEffects + ?Sized,
    {
        self.profiles
            .ensure_profile(effects, viewer, email, pseudo)
            .await
    }

    /// `viewer` follows `target`
    pub async fn follow<E>(&self, effects: &E, viewer: UserId, target: UserId) -> Result<FollowEdge>
    where
        E: SocialEffects + ?Sized,
    {
        self.graph.follow(effects, viewer, target).await
    }

    /// `viewer` stops following `target`
    pub async fn unfollow<E>(&self, effects: &E, viewer: UserId, target: UserId) -> Result<()>
    where
        E: SocialEffects + ?Sized,
    {
        self.graph.unfollow(effects, viewer, target).await
    }

    /// `viewer` publishes a post
    pub async fn post<E>(
        &self,
        effects: &E,
        viewer: UserId,
        content: &str,
        media: Option<Media>,
    ) -> Result<Post>
    where
        E: SocialEffects + ?Sized,
    {
        self.content
            .create_post(effects, viewer, content, media)
            .await
    }

    /// `viewer` replies under `parent`
    pub async fn reply<E>(
        &self,
        effects: &E,
        viewer: UserId,
        parent: &ContentPath,
        content: &str,
    ) -> Result<Reply>
    where
        E: SocialEffects + ?Sized,
    {
        self.content
            .create_reply(effects, viewer, parent, content)
            .await
    }

    /// `viewer` deletes a post or reply they wrote, with everything under it
    pub async fn delete<E>(
        &self,
        effects: &E,
        viewer: UserId,
        target: &ContentPath,
    ) -> Result<CascadeReport>
    where
        E: SocialEffects + ?Sized,
    {
        if target.is_post() {
            self.content
                .delete_post(effects, viewer, target.root())
                .await
        } else {
            self.content.delete_reply(effects, viewer, target).await
        }
    }

    /// `viewer` toggles their like on `target`
    pub async fn like<E>(
        &self,
        effects: &E,
        viewer: UserId,
        target: &ContentPath,
    ) -> Result<ToggleOutcome>
    where
        E: SocialEffects + ?Sized,
    {
        self.engagement
            .toggle(effects, EngagementKind::Like, viewer, target)
            .await
    }

    /// `viewer` toggles their retweet of `target`
    pub async fn retweet<E>(
        &self,
        effects: &E,
        viewer: UserId,
        target: &ContentPath,
    ) -> Result<ToggleOutcome>
    where
        E: SocialEffects + ?Sized,
    {
        self.engagement
            .toggle(effects, EngagementKind::Retweet, viewer, target)
            .await
    }

    /// Counters for `target` as `viewer` sees them
    pub async fn summary<E>(
        &self,
        effects: &E,
        viewer: UserId,
        target: &ContentPath,
    ) -> Result<EngagementSummary>
    where
        E: SocialEffects + ?Sized,
    {
        self.engagement
            .summary(effects, target, Some(viewer))
            .await
    }

    /// One page of `viewer`'s feed
    pub async fn feed<E>(
        &self,
        effects: &E,
        viewer: UserId,
        mode: FeedMode,
        page: PageRequest,
    ) -> Result<FeedPage>
    where
        E: SocialEffects + ?Sized,
    {
        self.feed.compose(effects, viewer, mode, page).await
    }

    /// Live first page of `viewer`'s feed
    pub fn watch_feed<E>(&self, effects: E, viewer: UserId, mode: FeedMode) -> FeedWatcher<E>
    where
        E: DocumentStoreEffects,
    {
        self.feed.watch(effects, viewer, mode, None)
    }
}
