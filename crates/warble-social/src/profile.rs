//! Identity/Profile Store
//!
//! Profiles are created the first time an identity authenticates and are
//! changed only by their owner. Profile pages read a user's own posts and,
//! through the reverse index, what they liked or retweeted.

use crate::config::SocialConfig;
use crate::engagement::EngagementKind;
use crate::error::{Result, SocialError};
use crate::feed::{self, FeedPage, PageRequest};
use crate::layout::{fields, profile_document};
use crate::records::{decode_all, Post, Profile, ProfileUpdate, ReverseIndexEntry};
use crate::store;
use futures::future::join_all;
use std::sync::Arc;
use warble_core::document::{Direction, Query, WriteBatch};
use warble_core::effects::{to_document_value, DocumentStoreEffects};
use warble_core::identifiers::UserId;

/// Normalize a display handle to exactly one leading `@`.
///
/// `"bob"`, `"@bob"` and `"@@bob"` all become `"@bob"`. Surrounding
/// whitespace is dropped; a handle with nothing after the `@` is invalid.
pub fn normalize_pseudo(raw: &str) -> Result<String> {
    let handle = raw.trim().trim_start_matches('@');
    if handle.is_empty() {
        return Err(SocialError::invalid("pseudo", "handle is empty"));
    }
    if handle.chars().any(char::is_whitespace) {
        return Err(SocialError::invalid("pseudo", "handle contains whitespace"));
    }
    Ok(format!("@{handle}"))
}

/// Handle derived from the local part of `email`, with whitespace removed.
fn pseudo_from_email(email: &str) -> Option<String> {
    let local: String = email
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    normalize_pseudo(&local).ok()
}

/// Profile operations
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    config: Arc<SocialConfig>,
}

impl ProfileStore {
    /// Create a profile store
    pub fn new(config: Arc<SocialConfig>) -> Self {
        Self { config }
    }

    /// Return the profile of `user`, creating it on first authentication.
    ///
    /// The handle defaults to the part of `email` before the `@` when no
    /// pseudo is requested, or to the configured default handle when that
    /// part is blank.
    pub async fn ensure_profile<E>(
        &self,
        effects: &E,
        user: UserId,
        email: &str,
        requested_pseudo: Option<&str>,
    ) -> Result<Profile>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        if let Some(existing) = self.find_profile(effects, user).await? {
            return Ok(existing);
        }

        let defaults = &self.config.defaults;
        let pseudo = match requested_pseudo {
            Some(requested) => normalize_pseudo(requested)?,
            None => match pseudo_from_email(email) {
                Some(pseudo) => pseudo,
                None => normalize_pseudo(&defaults.pseudo)?,
            },
        };
        let profile = Profile {
            id: user,
            email: email.to_string(),
            avatar: format!("{}{}", defaults.avatar_base_url, pseudo),
            pseudo,
            bio: String::new(),
            birthdate: None,
            cover: defaults.cover_url.clone(),
            created_at: store::timestamp(effects, &self.config.retry).await?,
        };

        let batch =
            WriteBatch::new().create(profile_document(user), to_document_value(&profile)?);
        match store::commit(effects, &self.config.retry, "ensure_profile", batch).await {
            Ok(()) => {
                tracing::debug!(%user, pseudo = %profile.pseudo, "profile created");
                Ok(profile)
            }
            // Another session created it first
            Err(SocialError::AlreadyExists { .. }) => self.get_profile(effects, user).await,
            Err(err) => Err(err),
        }
    }

    /// Profile of `user`, if one exists.
    pub async fn find_profile<E>(&self, effects: &E, user: UserId) -> Result<Option<Profile>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        store::get(effects, &self.config.retry, &profile_document(user))
            .await?
            .map(|doc| doc.decode::<Profile>().map_err(SocialError::from))
            .transpose()
    }

    /// Profile of `user`; `NotFound` if absent.
    pub async fn get_profile<E>(&self, effects: &E, user: UserId) -> Result<Profile>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        self.find_profile(effects, user)
            .await?
            .ok_or_else(|| SocialError::not_found(format!("profile {user}")))
    }

    /// Apply owner-supplied changes to a profile.
    pub async fn update_profile<E>(
        &self,
        effects: &E,
        actor: UserId,
        user: UserId,
        update: ProfileUpdate,
    ) -> Result<Profile>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        if actor != user {
            return Err(SocialError::forbidden("only the owner may edit a profile"));
        }

        let mut profile = self.get_profile(effects, user).await?;

        if let Some(bio) = update.bio {
            let chars = bio.chars().count();
            if chars > self.config.max_bio_chars {
                return Err(SocialError::invalid(
                    "bio",
                    format!(
                        "{chars} characters exceeds the limit of {}",
                        self.config.max_bio_chars
                    ),
                ));
            }
            profile.bio = bio;
        }
        if let Some(pseudo) = update.pseudo {
            profile.pseudo = normalize_pseudo(&pseudo)?;
        }
        if let Some(avatar) = update.avatar {
            profile.avatar = avatar;
        }
        if let Some(birthdate) = update.birthdate {
            profile.birthdate = Some(birthdate).filter(|b| !b.trim().is_empty());
        }
        if let Some(cover) = update.cover {
            profile.cover = cover;
        }

        let batch = WriteBatch::new().set(profile_document(user), to_document_value(&profile)?);
        store::commit(effects, &self.config.retry, "update_profile", batch).await?;
        tracing::debug!(%user, "profile updated");
        Ok(profile)
    }

    /// Posts authored by `user`, newest first.
    pub async fn posts_by<E>(
        &self,
        effects: &E,
        user: UserId,
        page: PageRequest,
    ) -> Result<FeedPage>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let limit = self.config.feed.page_size(page.limit);
        let authors = std::slice::from_ref(&user);
        feed::page_of_posts(effects, &self.config.retry, Some(authors), limit, page.after).await
    }

    /// Posts `user` liked, most recent like first.
    pub async fn liked_posts<E>(&self, effects: &E, user: UserId) -> Result<Vec<Post>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        self.engaged_posts(effects, user, EngagementKind::Like).await
    }

    /// Posts `user` retweeted, most recent retweet first.
    pub async fn retweeted_posts<E>(&self, effects: &E, user: UserId) -> Result<Vec<Post>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        self.engaged_posts(effects, user, EngagementKind::Retweet)
            .await
    }

    async fn engaged_posts<E>(
        &self,
        effects: &E,
        user: UserId,
        kind: EngagementKind,
    ) -> Result<Vec<Post>>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let retry = &self.config.retry;
        let index = Query::collection(kind.reverse_index(user))
            .order_by(fields::CREATED_AT, Direction::Descending);
        let entries: Vec<ReverseIndexEntry> =
            decode_all(&store::query(effects, retry, &index).await?)?;

        let lookups = entries
            .iter()
            .filter(|entry| entry.target.is_post())
            .map(|entry| {
                let path = entry.target.document();
                async move { store::get(effects, retry, &path).await }
            });
        let documents = join_all(lookups).await;

        let mut posts = Vec::with_capacity(documents.len());
        for (entry, document) in entries.iter().filter(|e| e.target.is_post()).zip(documents) {
            match document? {
                Some(doc) => posts.push(doc.decode::<Post>()?),
                None => {
                    tracing::warn!(
                        %user,
                        content = %entry.target,
                        %kind,
                        "reverse index points at deleted post"
                    );
                }
            }
        }
        Ok(posts)
    }
}
