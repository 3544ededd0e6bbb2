// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors raised by the episode store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open episode store {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to migrate episode store schema: {0}")]
    MigrationFailed(#[source] sqlx::Error),

    #[error("Episode store query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Unrecognised timestamp '{value}' in episode store")]
    InvalidTimestamp { value: String },
}

/// Errors that can occur when publishing a post
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("HTTP request to {url} failed: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Publishing rejected with HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid API base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to read access token file {path}: {source}")]
    SecretReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Access token is empty")]
    EmptySecret,
}

/// Errors raised while loading or rendering a post template
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read post template {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown placeholder '{{{{ {name} }}}}' in post template")]
    UnknownPlaceholder { name: String },

    #[error("Unclosed placeholder at byte {offset} of post template")]
    Unclosed { offset: usize },
}

/// Errors raised while loading the application configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} is missing from {source_file}")]
    MissingSetting { key: String, source_file: PathBuf },

    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse environment file {path}: {source}")]
    EnvParseFailed {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Failed to parse feeds file {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Feeds file {0} does not define any feeds")]
    NoFeeds(PathBuf),

    #[error("Feed name '{0}' is used more than once")]
    DuplicateFeedName(String),
}

/// Errors that can occur when exporting or importing store entries
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Episode database {0} not found")]
    DatabaseNotFound(PathBuf),

    #[error("Entries file {0} not found")]
    EntriesFileNotFound(PathBuf),

    #[error("Failed to access entries file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse entries file {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize entries: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors that abort a single feed's cycle
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Publisher setup failed: {0}")]
    Publisher(#[from] PublishError),
}
