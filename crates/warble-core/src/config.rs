//! Configuration traits
//!
//! Configuration is layered: compiled defaults, then an optional TOML file,
//! then `WARBLE_`-prefixed environment variables, then validation. Nested
//! keys are separated by a double underscore in environment names, so
//! `WARBLE_FEED__DEFAULT_PAGE_SIZE=50` sets `feed.default_page_size`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file {path}: {reason}")]
    Io {
        /// File that failed
        path: String,
        /// OS message
        reason: String,
    },

    /// File or overlay did not parse into the config type
    #[error("failed to parse configuration: {reason}")]
    Parse {
        /// Parser message
        reason: String,
    },

    /// A value is out of its accepted range
    #[error("field '{field}': {message}")]
    Invalid {
        /// Dotted field name
        field: String,
        /// What is wrong
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid field error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Require `min <= value <= max`
    pub fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), Self> {
        if value < min || value > max {
            return Err(Self::invalid(
                field,
                format!("must be between {min} and {max} (got {value})"),
            ));
        }
        Ok(())
    }
}

/// Core trait for Warble configuration types
pub trait WarbleConfig:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Prefix for environment overrides
    const ENV_PREFIX: &'static str = "WARBLE_";

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Parse from TOML text and validate
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Merge with process environment variables
    fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with an explicit set of variables (only prefixed keys apply)
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = serde_json::to_value(&*self).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;

        let mut touched = false;
        for (key, raw) in vars {
            let Some(stripped) = key.strip_prefix(Self::ENV_PREFIX) else {
                continue;
            };
            let parts: Vec<String> = stripped
                .split("__")
                .map(|p| p.to_ascii_lowercase())
                .collect();
            set_nested(&mut tree, &parts, parse_scalar(&raw));
            touched = true;
        }

        if touched {
            *self = serde_json::from_value(tree).map_err(|e| ConfigError::Parse {
                reason: format!("environment override: {e}"),
            })?;
        }
        Ok(())
    }

    /// Defaults, then `path` if given, then the environment, then validation
    fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        tracing::debug!(source = ?path, "configuration loaded");
        Ok(config)
    }
}

fn parse_scalar(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_nested(tree: &mut Value, parts: &[String], value: Value) {
    let Some((last, parents)) = parts.split_last() else {
        return;
    };
    let mut cursor = tree;
    for part in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(serde_json::Map::new());
        }
        let Value::Object(map) = cursor else {
            return;
        };
        cursor = map
            .entry(part.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if let Value::Object(map) = cursor {
        map.insert(last.clone(), value);
    }
}
