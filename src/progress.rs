// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::run::FeedStage;

/// Events emitted while feeds are processed
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A feed cycle is starting
    FeedStarted {
        feed: String,
        feed_url: String,
        dry_run: bool,
    },

    /// Feed was fetched and parsed
    FeedFetched { feed: String, episodes: usize },

    /// Dedup filter finished
    EpisodesFiltered {
        feed: String,
        total_episodes: usize,
        new_episodes: usize,
    },

    /// A post was published
    PostPublished { feed: String, episode_title: String },

    /// A post could not be published; the episode stays recorded
    PostFailed {
        feed: String,
        episode_title: String,
        error: String,
    },

    /// Dry run: the post that would have been published
    PostRendered {
        feed: String,
        episode_title: String,
        content: String,
    },

    /// Old records were evicted from the store
    RecordsEvicted { feed: String, count: u64 },

    /// The feed cycle aborted
    FeedFailed {
        feed: String,
        stage: FeedStage,
        error: String,
    },

    /// The feed cycle finished
    FeedCompleted {
        feed: String,
        posted: usize,
        failed: usize,
    },
}

/// Trait for reporting progress events during a run.
///
/// Implementations can use this to print a console summary, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

/// Forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FeedStarted {
                feed,
                feed_url,
                dry_run,
            } => tracing::info!(%feed, %feed_url, dry_run, "Processing feed"),
            ProgressEvent::FeedFetched { feed, episodes } => {
                tracing::info!(%feed, episodes, "Fetched feed")
            }
            ProgressEvent::EpisodesFiltered {
                feed,
                total_episodes,
                new_episodes,
            } => tracing::info!(%feed, total_episodes, new_episodes, "Filtered episodes"),
            ProgressEvent::PostPublished {
                feed,
                episode_title,
            } => tracing::info!(%feed, %episode_title, "Published post"),
            ProgressEvent::PostFailed {
                feed,
                episode_title,
                error,
            } => tracing::error!(%feed, %episode_title, %error, "Failed to publish post"),
            ProgressEvent::PostRendered {
                feed,
                episode_title,
                content,
            } => tracing::info!(%feed, %episode_title, %content, "Dry run, not publishing"),
            ProgressEvent::RecordsEvicted { feed, count } => {
                tracing::info!(%feed, count, "Evicted old records")
            }
            ProgressEvent::FeedFailed { feed, stage, error } => {
                tracing::error!(%feed, ?stage, %error, "Feed cycle failed")
            }
            ProgressEvent::FeedCompleted {
                feed,
                posted,
                failed,
            } => tracing::info!(%feed, posted, failed, "Feed cycle completed"),
        }
    }
}

impl TracingReporter {
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
