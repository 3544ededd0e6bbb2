// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use chrono::Utc;
use tracing::Instrument;

use crate::config::FeedProfile;
use crate::dedup::{FilterOptions, filter_new_episodes};
use crate::error::{PublishError, RunError};
use crate::feed::fetch_episodes;
use crate::format::PostFormatter;
use crate::http::{HttpClient, USER_AGENT};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::publish::Publisher;
use crate::store::EpisodeStore;

/// Where a feed cycle is, or where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStage {
    Init,
    Fetched,
    Filtered,
    Publishing,
    Cleaned,
    Done,
    Failed,
}

impl fmt::Display for FeedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Fetched => "fetch",
            Self::Filtered => "filter",
            Self::Publishing => "publish",
            Self::Cleaned => "cleanup",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Options shared by every feed in a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Render posts instead of publishing them; no store writes
    pub dry_run: bool,
    /// Leave old records in the store
    pub skip_cleanup: bool,
    /// User agent sent when fetching feeds
    pub user_agent: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_cleanup: false,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Result of one completed feed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedRunSummary {
    /// Episodes returned by the feed (after the episode cap)
    pub fetched: usize,
    /// Episodes judged new
    pub new_episodes: usize,
    /// Posts published, or rendered in a dry run
    pub posted: usize,
    /// Posts the publisher rejected
    pub failed_posts: usize,
    /// Records evicted from the store
    pub evicted: u64,
    pub dry_run: bool,
}

/// A feed cycle that aborted
#[derive(Debug)]
pub struct FeedFailure {
    /// Stage the cycle was in when it failed
    pub stage: FeedStage,
    pub error: RunError,
}

impl FeedFailure {
    fn new(stage: FeedStage, error: impl Into<RunError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

impl fmt::Display for FeedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage: {}", self.stage, self.error)
    }
}

impl std::error::Error for FeedFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of one feed within a run
#[derive(Debug)]
pub struct FeedOutcome {
    pub feed: String,
    pub result: Result<FeedRunSummary, FeedFailure>,
}

impl FeedOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run one feed cycle: fetch, dedup, format, publish, evict
///
/// Episodes are recorded before they are published, so a post that fails
/// is logged and never retried. A dry run renders posts through the
/// reporter and leaves the store untouched.
pub async fn run_feed<C: HttpClient + ?Sized>(
    client: &C,
    publisher: &dyn Publisher,
    profile: &FeedProfile,
    options: &RunOptions,
    reporter: &SharedProgressReporter,
) -> Result<FeedRunSummary, FeedFailure> {
    let feed = profile.label().to_string();
    let span = tracing::info_span!("feed", feed = %feed);

    let result = run_cycle(client, publisher, profile, options, reporter, &feed)
        .instrument(span)
        .await;

    match &result {
        Ok(summary) => reporter.report(ProgressEvent::FeedCompleted {
            feed,
            posted: summary.posted,
            failed: summary.failed_posts,
        }),
        Err(failure) => reporter.report(ProgressEvent::FeedFailed {
            feed,
            stage: failure.stage,
            error: failure.error.to_string(),
        }),
    }

    result
}

async fn run_cycle<C: HttpClient + ?Sized>(
    client: &C,
    publisher: &dyn Publisher,
    profile: &FeedProfile,
    options: &RunOptions,
    reporter: &SharedProgressReporter,
    feed: &str,
) -> Result<FeedRunSummary, FeedFailure> {
    let now = Utc::now();

    reporter.report(ProgressEvent::FeedStarted {
        feed: feed.to_string(),
        feed_url: profile.feed_url.clone(),
        dry_run: options.dry_run,
    });

    let formatter =
        PostFormatter::from_template_file(&profile.template_path, profile.description_max_length)
            .map_err(|e| FeedFailure::new(FeedStage::Init, e))?;

    let store = EpisodeStore::open(&profile.database_file.to_string_lossy())
        .await
        .map_err(|e| FeedFailure::new(FeedStage::Init, e))?;

    let episodes = fetch_episodes(
        client,
        &profile.feed_url,
        profile.max_episodes,
        &options.user_agent,
    )
    .await
    .map_err(|e| FeedFailure::new(FeedStage::Fetched, e))?;

    reporter.report(ProgressEvent::FeedFetched {
        feed: feed.to_string(),
        episodes: episodes.len(),
    });

    let filter = FilterOptions {
        recency_window_days: profile.recent_days,
        guid_filter: profile.guid_filter.as_deref(),
        feed_name: profile.name.as_deref(),
        dry_run: options.dry_run,
        now,
    };
    let plan = filter_new_episodes(&store, &episodes, &filter)
        .await
        .map_err(|e| FeedFailure::new(FeedStage::Filtered, e))?;

    tracing::debug!(
        too_old = plan.too_old,
        already_seen = plan.already_seen,
        rejected_by_filter = plan.rejected_by_filter,
        duplicate_enclosures = plan.duplicate_enclosures.len(),
        "Dedup finished"
    );
    reporter.report(ProgressEvent::EpisodesFiltered {
        feed: feed.to_string(),
        total_episodes: plan.total_episodes,
        new_episodes: plan.new_episodes.len(),
    });

    let mut summary = FeedRunSummary {
        fetched: episodes.len(),
        new_episodes: plan.new_episodes.len(),
        dry_run: options.dry_run,
        ..Default::default()
    };

    // Oldest first, so posts appear in publication order
    for episode in plan.new_episodes.iter().rev() {
        let content = formatter.format(episode, profile.podcast_name.as_deref());

        if options.dry_run {
            reporter.report(ProgressEvent::PostRendered {
                feed: feed.to_string(),
                episode_title: episode.title.clone(),
                content,
            });
            summary.posted += 1;
            continue;
        }

        match publisher.post(&content).await {
            Ok(()) => {
                reporter.report(ProgressEvent::PostPublished {
                    feed: feed.to_string(),
                    episode_title: episode.title.clone(),
                });
                summary.posted += 1;
            }
            Err(e) => {
                reporter.report(ProgressEvent::PostFailed {
                    feed: feed.to_string(),
                    episode_title: episode.title.clone(),
                    error: e.to_string(),
                });
                summary.failed_posts += 1;
            }
        }
    }

    if options.dry_run || options.skip_cleanup {
        tracing::debug!("Skipping cleanup");
    } else {
        summary.evicted = store
            .evict(profile.name.as_deref(), profile.database_clean_days, now)
            .await
            .map_err(|e| FeedFailure::new(FeedStage::Cleaned, e))?;

        reporter.report(ProgressEvent::RecordsEvicted {
            feed: feed.to_string(),
            count: summary.evicted,
        });
    }

    store.close().await;
    Ok(summary)
}

/// Run every profile in order
///
/// `make_publisher` builds the publisher for each profile; a profile whose
/// publisher cannot be built fails at [`FeedStage::Init`]. A failing feed
/// never stops the feeds after it.
pub async fn run_feeds<C, F>(
    client: &C,
    profiles: &[FeedProfile],
    mut make_publisher: F,
    options: &RunOptions,
    reporter: &SharedProgressReporter,
) -> Vec<FeedOutcome>
where
    C: HttpClient + ?Sized,
    F: FnMut(&FeedProfile) -> Result<Box<dyn Publisher>, PublishError>,
{
    let mut outcomes = Vec::with_capacity(profiles.len());

    for profile in profiles {
        let feed = profile.label().to_string();

        let result = match make_publisher(profile) {
            Ok(publisher) => run_feed(client, publisher.as_ref(), profile, options, reporter).await,
            Err(e) => {
                let failure = FeedFailure::new(FeedStage::Init, e);
                reporter.report(ProgressEvent::FeedFailed {
                    feed: feed.clone(),
                    stage: failure.stage,
                    error: failure.error.to_string(),
                });
                Err(failure)
            }
        };

        outcomes.push(FeedOutcome { feed, result });
    }

    outcomes
}
