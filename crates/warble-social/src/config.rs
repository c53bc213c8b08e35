//! Social service configuration
//!
//! ```toml
//! max_bio_chars = 160
//!
//! [feed]
//! default_page_size = 20
//! max_page_size = 100
//! own_posts_without_follows = false
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 100
//! max_delay_ms = 2000
//! strategy = "exponential"
//!
//! [cascade]
//! max_sweeps = 3
//!
//! [defaults]
//! avatar_base_url = "https://api.dicebear.com/7.x/initials/svg?seed="
//! cover_url = "https://images.unsplash.com/photo-1503264116251-35a269479413"
//! pseudo = "Utilisateur"
//! ```

use serde::{Deserialize, Serialize};
use warble_core::config::{ConfigError, WarbleConfig};
use warble_core::reliability::RetryPolicy;

/// Feed sizing and composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Page size when the caller does not ask for one
    pub default_page_size: usize,
    /// Largest page a caller may request
    pub max_page_size: usize,
    /// Show the viewer's own posts in the following feed even with zero follows
    pub own_posts_without_follows: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            own_posts_without_follows: false,
        }
    }
}

impl FeedConfig {
    /// Clamp a requested page size into `1..=max_page_size`. A zero
    /// maximum still yields pages of one.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

/// Cascading delete tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Follow-up passes that remove records written under a deleted node
    /// while the delete batch was being assembled
    pub max_sweeps: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self { max_sweeps: 3 }
    }
}

/// Defaults applied to freshly created profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDefaults {
    /// Avatar URL prefix; the pseudo is appended as the seed
    pub avatar_base_url: String,
    /// Cover image URL
    pub cover_url: String,
    /// Handle used when the email offers no usable one
    pub pseudo: String,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            avatar_base_url: "https://api.dicebear.com/7.x/initials/svg?seed=".into(),
            cover_url: "https://images.unsplash.com/photo-1503264116251-35a269479413?auto=format&fit=crop&w=800&q=80".into(),
            pseudo: "Utilisateur".into(),
        }
    }
}

/// Top-level configuration for `warble-social`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Longest accepted bio, in characters
    pub max_bio_chars: usize,
    /// Feed settings
    pub feed: FeedConfig,
    /// Retry policy for store mutations
    pub retry: RetryPolicy,
    /// Cascading delete settings
    pub cascade: CascadeConfig,
    /// New profile defaults
    pub defaults: ProfileDefaults,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            max_bio_chars: 160,
            feed: FeedConfig::default(),
            retry: RetryPolicy::default(),
            cascade: CascadeConfig::default(),
            defaults: ProfileDefaults::default(),
        }
    }
}

impl WarbleConfig for SocialConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("max_bio_chars", self.max_bio_chars as u64, 1, 10_000)?;
        ConfigError::check_range("feed.max_page_size", self.feed.max_page_size as u64, 1, 1_000)?;
        ConfigError::check_range(
            "feed.default_page_size",
            self.feed.default_page_size as u64,
            1,
            self.feed.max_page_size as u64,
        )?;
        ConfigError::check_range("retry.max_attempts", u64::from(self.retry.max_attempts), 0, 10)?;
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::invalid(
                "retry.initial_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }
        ConfigError::check_range("cascade.max_sweeps", u64::from(self.cascade.max_sweeps), 0, 16)?;
        if crate::profile::normalize_pseudo(&self.defaults.pseudo).is_err() {
            return Err(ConfigError::invalid(
                "defaults.pseudo",
                "must be a non-empty handle without whitespace",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults_validate() {
        let config = SocialConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_bio_chars, 160);
        assert!(!config.feed.own_posts_without_follows);
    }

    #[test]
    fn test_toml_and_env_layers() {
        let mut config = SocialConfig::from_toml_str(
            "[feed]\ndefault_page_size = 10\n\n[retry]\nstrategy = \"fixed\"\n",
        )
        .unwrap();
        assert_eq!(config.feed.default_page_size, 10);
        assert_eq!(config.feed.max_page_size, 100);

        config
            .merge_with_vars(vec![(
                "WARBLE_FEED__OWN_POSTS_WITHOUT_FOLLOWS".to_string(),
                "true".to_string(),
            )])
            .unwrap();
        assert!(config.feed.own_posts_without_follows);
    }

    #[test]
    fn test_page_size_above_max_rejected() {
        let err = SocialConfig::from_toml_str("[feed]\ndefault_page_size = 500\n").unwrap_err();
        assert_matches!(err, ConfigError::Invalid { field, .. } if field == "feed.default_page_size");
    }

    #[test]
    fn test_page_size_clamps() {
        let feed = FeedConfig::default();
        assert_eq!(feed.page_size(None), 20);
        assert_eq!(feed.page_size(Some(0)), 1);
        assert_eq!(feed.page_size(Some(1_000)), 100);
    }

    #[test]
    fn test_zero_max_page_size_is_rejected_but_never_panics() {
        let feed = FeedConfig {
            default_page_size: 0,
            max_page_size: 0,
            own_posts_without_follows: false,
        };
        assert_eq!(feed.page_size(None), 1);
        assert_eq!(feed.page_size(Some(50)), 1);

        let config = SocialConfig {
            feed,
            ..SocialConfig::default()
        };
        assert_matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "feed.max_page_size"
        );
    }

    #[test]
    fn test_blank_default_pseudo_rejected() {
        let err = SocialConfig::from_toml_str("[defaults]\npseudo = \"@ \"\n").unwrap_err();
        assert_matches!(err, ConfigError::Invalid { field, .. } if field == "defaults.pseudo");
    }
}
