// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Feed profiles, loaded from a dotenv file (one feed) or a JSON feeds file.
//!
//! Every setting is validated before any feed runs. Keeping
//! `database_clean_days` above `recent_days` is left to the operator; a
//! profile that violates it is accepted with a warning.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::format::DEFAULT_DESCRIPTION_MAX_LENGTH;

pub const DEFAULT_DB_FILE: &str = "feed_info.sqlite3";
pub const DEFAULT_DB_CLEAN_DAYS: u32 = 90;
pub const DEFAULT_RECENT_DAYS: u32 = 5;
pub const DEFAULT_MAX_EPISODES: usize = 50;
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";
pub const DEFAULT_TEMPLATE_FILE: &str = "post.txt.jinja";

/// Mastodon account a feed posts to
#[derive(Debug)]
pub struct MastodonSettings {
    pub api_url: String,
    /// Access token, or the path of a file holding it
    pub secret: SecretString,
}

/// Everything needed to run one feed cycle
#[derive(Debug)]
pub struct FeedProfile {
    /// Feed identity used to scope store records; `None` in single-feed mode
    pub name: Option<String>,
    pub podcast_name: Option<String>,
    pub feed_url: String,
    pub recent_days: u32,
    pub max_episodes: usize,
    pub guid_filter: Option<String>,
    pub database_file: PathBuf,
    pub database_clean_days: u32,
    pub template_path: PathBuf,
    pub description_max_length: usize,
    pub mastodon: MastodonSettings,
}

impl FeedProfile {
    /// Name used in logs and reports
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.podcast_name.as_deref())
            .unwrap_or(&self.feed_url)
    }

    fn warn_on_short_retention(&self) {
        if self.database_clean_days <= self.recent_days {
            tracing::warn!(
                feed = %self.label(),
                database_clean_days = self.database_clean_days,
                recent_days = self.recent_days,
                "Retention window does not exceed recency window; evicted episodes may be posted again"
            );
        }
    }

    /// Load a single-feed profile from a dotenv file
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let values = read_env_file(path)?;
        let profile = Self::from_env_values(&values, path)?;
        profile.warn_on_short_retention();
        Ok(profile)
    }

    fn from_env_values(values: &HashMap<String, String>, path: &Path) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingSetting {
                    key: key.to_string(),
                    source_file: path.to_path_buf(),
                })
        };
        let optional = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let feed_url = required("PODCAST_FEED_URL")?;
        let secret = required("MASTODON_SECRET")?;
        let api_url = required("MASTODON_API_BASE_URL")?;

        let template_dir = optional("POST_TEMPLATE_DIR").unwrap_or_else(|| DEFAULT_TEMPLATE_DIR.to_string());
        let template_file = optional("POST_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE_FILE.to_string());

        Ok(Self {
            name: None,
            podcast_name: optional("PODCAST_NAME"),
            feed_url,
            recent_days: parse_number(values, "RECENT_DAYS", DEFAULT_RECENT_DAYS)?,
            max_episodes: parse_number(values, "MAX_EPISODES", DEFAULT_MAX_EPISODES)?,
            guid_filter: optional("GUID_FILTER"),
            database_file: PathBuf::from(
                optional("DB_FILE").unwrap_or_else(|| DEFAULT_DB_FILE.to_string()),
            ),
            database_clean_days: parse_number(values, "DB_CLEAN_DAYS", DEFAULT_DB_CLEAN_DAYS)?,
            template_path: Path::new(&template_dir).join(template_file),
            description_max_length: parse_number(
                values,
                "DESCRIPTION_MAX_LENGTH",
                DEFAULT_DESCRIPTION_MAX_LENGTH,
            )?,
            mastodon: MastodonSettings {
                api_url,
                secret: SecretString::from(secret),
            },
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let env_error = |e: dotenvy::Error| match e {
        dotenvy::Error::Io(source) => ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        },
        other => ConfigError::EnvParseFailed {
            path: path.to_path_buf(),
            source: other,
        },
    };

    let mut values = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(env_error)? {
        let (key, value) = item.map_err(env_error)?;
        values.insert(key, value);
    }
    Ok(values)
}

fn parse_number<T: std::str::FromStr>(
    values: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match values.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

// ============================================================================
// Multi-feed JSON file
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeedsFile {
    #[serde(default = "default_db_file")]
    database_file: PathBuf,
    #[serde(default = "default_db_clean_days")]
    database_clean_days: u32,
    #[serde(default = "default_template_dir")]
    template_dir: PathBuf,
    #[serde(default = "default_description_max_length")]
    description_max_length: usize,
    #[serde(default)]
    feeds: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    name: String,
    #[serde(default)]
    podcast_name: Option<String>,
    feed_url: String,
    #[serde(default)]
    recent_days: Option<u32>,
    #[serde(default)]
    max_episodes: Option<usize>,
    #[serde(default)]
    guid_filter: Option<String>,
    #[serde(default)]
    database_file: Option<PathBuf>,
    #[serde(default)]
    database_clean_days: Option<u32>,
    #[serde(default)]
    template_file: Option<String>,
    mastodon: MastodonEntry,
}

#[derive(Debug, Deserialize)]
struct MastodonEntry {
    api_url: String,
    secret: String,
}

fn default_db_file() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

fn default_db_clean_days() -> u32 {
    DEFAULT_DB_CLEAN_DAYS
}

fn default_template_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATE_DIR)
}

fn default_description_max_length() -> usize {
    DEFAULT_DESCRIPTION_MAX_LENGTH
}

/// Load every feed profile from a JSON feeds file
pub fn load_feeds_file(path: &Path) -> Result<Vec<FeedProfile>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_feeds(&content, path)
}

fn parse_feeds(content: &str, path: &Path) -> Result<Vec<FeedProfile>, ConfigError> {
    let file: FeedsFile = serde_json::from_str(content).map_err(|e| ConfigError::JsonParseFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    if file.feeds.is_empty() {
        return Err(ConfigError::NoFeeds(path.to_path_buf()));
    }

    let mut names = HashSet::new();
    let mut profiles = Vec::with_capacity(file.feeds.len());

    for entry in file.feeds {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::MissingSetting {
                key: "feeds[].name".to_string(),
                source_file: path.to_path_buf(),
            });
        }
        if !names.insert(name.clone()) {
            return Err(ConfigError::DuplicateFeedName(name));
        }

        let template_file = entry
            .template_file
            .unwrap_or_else(|| DEFAULT_TEMPLATE_FILE.to_string());

        let profile = FeedProfile {
            name: Some(name),
            podcast_name: entry.podcast_name.filter(|n| !n.trim().is_empty()),
            feed_url: entry.feed_url.trim().to_string(),
            recent_days: entry.recent_days.unwrap_or(DEFAULT_RECENT_DAYS),
            max_episodes: entry.max_episodes.unwrap_or(DEFAULT_MAX_EPISODES),
            guid_filter: entry.guid_filter.filter(|f| !f.trim().is_empty()),
            database_file: entry
                .database_file
                .unwrap_or_else(|| file.database_file.clone()),
            database_clean_days: entry
                .database_clean_days
                .unwrap_or(file.database_clean_days),
            template_path: file.template_dir.join(template_file),
            description_max_length: file.description_max_length,
            mastodon: MastodonSettings {
                api_url: entry.mastodon.api_url,
                secret: SecretString::from(entry.mastodon.secret),
            },
        };
        profile.warn_on_short_retention();
        profiles.push(profile);
    }

    Ok(profiles)
}
