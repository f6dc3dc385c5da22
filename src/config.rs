//! Configuration file parser for ~/.config/feedscan/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{FetchOptions, ParseOptions, Schema, TagDescriptor};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Replaces the built-in feed-level tag list when set.
    pub feed_tags: Option<Vec<String>>,

    /// Replaces the built-in entry-level tag list when set.
    pub item_tags: Option<Vec<String>>,

    /// Appended to the feed-level tag list.
    pub extra_feed_tags: Vec<String>,

    /// Appended to the entry-level tag list.
    pub extra_item_tags: Vec<String>,

    /// Entry tags collected as arrays.
    pub array_tags: Vec<String>,

    /// Per-request timeout for URL sources.
    pub timeout_secs: u64,

    pub follow_redirects: bool,

    /// Overrides the `feedscan/<version>` user agent.
    pub user_agent: Option<String>,

    /// Extra request headers for URL sources.
    pub headers: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_tags: None,
            item_tags: None,
            extra_feed_tags: Vec::new(),
            extra_item_tags: Vec::new(),
            array_tags: Vec::new(),
            timeout_secs: 30,
            follow_redirects: true,
            user_agent: None,
            headers: HashMap::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "feed_tags",
        "item_tags",
        "extra_feed_tags",
        "extra_item_tags",
        "array_tags",
        "timeout_secs",
        "follow_redirects",
        "user_agent",
        "headers",
    ];

    /// `~/.config/feedscan/config.toml`, or `None` when `HOME` is unset.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("feedscan")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                tracing::warn!(path = %path.display(), bytes = meta.len(), "Config file too large");
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text. Blank text yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::debug!(
            array_tags = config.array_tags.len(),
            timeout_secs = config.timeout_secs,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The extraction schema: the built-in lists (or their replacements) plus extras.
    pub fn schema(&self) -> Schema {
        let mut schema = Schema::default();
        if let Some(tags) = &self.feed_tags {
            schema.set_feed_tags(tags.iter().map(String::as_str));
        }
        if let Some(tags) = &self.item_tags {
            schema.set_item_tags(tags.iter().map(String::as_str));
        }
        for tag in &self.extra_feed_tags {
            schema.push_feed_tag(TagDescriptor::parse(tag.as_str()));
        }
        for tag in &self.extra_item_tags {
            schema.push_item_tag(TagDescriptor::parse(tag.as_str()));
        }
        schema
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            array_tags: self.array_tags.iter().cloned().collect(),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            headers: self.headers.clone(),
            follow_redirects: self.follow_redirects,
            parse: self.parse_options(),
            ..FetchOptions::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
