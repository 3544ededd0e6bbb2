// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::StoreError;
use crate::feed::FetchedEpisode;
use crate::store::EpisodeStore;

/// Snapshot of what a store has already recorded for one feed
#[derive(Debug, Clone, Default)]
pub struct SeenEpisodes {
    pub guids: HashSet<String>,
    pub enclosure_urls: HashSet<String>,
}

impl SeenEpisodes {
    /// Take the snapshot used for a whole cycle
    pub async fn load(store: &EpisodeStore, feed_name: Option<&str>) -> Result<Self, StoreError> {
        Ok(Self {
            guids: store.seen_guids(feed_name).await?,
            enclosure_urls: store.seen_enclosure_urls(feed_name).await?,
        })
    }

    /// An episode is a candidate when either identity is unknown
    ///
    /// Episodes without an enclosure URL only have the GUID signal.
    pub fn is_candidate(&self, episode: &FetchedEpisode) -> bool {
        let guid_unseen = !self.guids.contains(&episode.guid);
        let url_unseen = episode
            .enclosure_url
            .as_ref()
            .is_some_and(|url| !self.enclosure_urls.contains(url));

        guid_unseen || url_unseen
    }
}

/// Settings for one dedup pass
#[derive(Debug, Clone)]
pub struct FilterOptions<'a> {
    /// Episodes published longer ago than this are never eligible
    pub recency_window_days: u32,
    /// Case-insensitive substring a GUID must contain; empty means no filtering
    pub guid_filter: Option<&'a str>,
    /// Feed identity to scope lookups and records to
    pub feed_name: Option<&'a str>,
    /// Evaluate only; write no records
    pub dry_run: bool,
    /// Wall-clock time of this cycle, also used as the record timestamp
    pub now: DateTime<Utc>,
}

/// An episode judged new, with normalized fields
#[derive(Debug, Clone, PartialEq)]
pub struct NewEpisode {
    pub guid: String,
    pub published: DateTime<Utc>,
    pub title: String,
    /// Description markup, trimmed
    pub description: String,
    pub duration: Duration,
    pub url: Option<String>,
}

impl NewEpisode {
    fn from_fetched(episode: &FetchedEpisode) -> Self {
        Self {
            guid: episode.guid.clone(),
            published: episode.published,
            title: episode.title.trim().to_string(),
            description: episode.description.trim().to_string(),
            duration: episode.duration.unwrap_or_default(),
            url: episode.enclosure_url.as_ref().map(|url| url.trim().to_string()),
        }
    }
}

/// Outcome of evaluating one fetched batch
#[derive(Debug, Clone, Default)]
pub struct DedupPlan {
    /// Accepted episodes in feed order (newest first)
    pub new_episodes: Vec<NewEpisode>,
    /// Episodes outside the recency window
    pub too_old: usize,
    /// Episodes whose GUID and enclosure URL are both recorded
    pub already_seen: usize,
    /// Candidates rejected by the GUID substring filter
    pub rejected_by_filter: usize,
    /// GUIDs of candidates sharing an enclosure URL with an episode accepted
    /// earlier in the batch; recorded GUID-only so they stay skipped
    pub duplicate_enclosures: Vec<String>,
    /// Number of episodes evaluated
    pub total_episodes: usize,
}

/// Decide which fetched episodes are new, without touching the store
///
/// Evaluation follows feed order:
/// 1. episodes older than the recency window are skipped
/// 2. an episode is a candidate if its GUID or its enclosure URL is unseen
/// 3. a non-empty GUID filter must occur in the GUID, ignoring case
/// 4. a later episode reusing an enclosure URL already accepted in this
///    batch is skipped, so one media file is never posted twice per cycle
pub fn plan_new_episodes(
    episodes: &[FetchedEpisode],
    seen: &SeenEpisodes,
    options: &FilterOptions<'_>,
) -> DedupPlan {
    let window = TimeDelta::days(i64::from(options.recency_window_days));
    let guid_filter = options
        .guid_filter
        .map(str::trim)
        .filter(|filter| !filter.is_empty())
        .map(str::to_lowercase);

    let mut plan = DedupPlan {
        total_episodes: episodes.len(),
        ..Default::default()
    };
    let mut accepted_urls: HashSet<&str> = HashSet::new();

    for episode in episodes {
        if options.now - episode.published > window {
            plan.too_old += 1;
            continue;
        }

        if !seen.is_candidate(episode) {
            plan.already_seen += 1;
            continue;
        }

        if let Some(filter) = &guid_filter
            && !episode.guid.to_lowercase().contains(filter.as_str())
        {
            tracing::debug!(guid = %episode.guid, "GUID does not match filter, skipping");
            plan.rejected_by_filter += 1;
            continue;
        }

        if let Some(url) = episode.enclosure_url.as_deref()
            && !accepted_urls.insert(url)
        {
            tracing::debug!(guid = %episode.guid, url, "Enclosure already accepted this cycle, skipping");
            plan.duplicate_enclosures.push(episode.guid.clone());
            continue;
        }

        plan.new_episodes.push(NewEpisode::from_fetched(episode));
    }

    plan
}

/// Filter a fetched batch down to new episodes and record each one
///
/// The seen-sets are read once up front. Unless `dry_run` is set, every
/// accepted episode gets a record: with its enclosure URL when that URL was
/// not in the snapshot, GUID-only otherwise. Episodes skipped for repeating
/// an enclosure URL within the batch get a GUID-only record too, so a later
/// run does not mistake them for new. Records are written before any
/// publishing happens, so a failed post is never retried on a later run.
pub async fn filter_new_episodes(
    store: &EpisodeStore,
    episodes: &[FetchedEpisode],
    options: &FilterOptions<'_>,
) -> Result<DedupPlan, StoreError> {
    let seen = SeenEpisodes::load(store, options.feed_name).await?;
    tracing::debug!(
        guids = seen.guids.len(),
        enclosure_urls = seen.enclosure_urls.len(),
        "Loaded seen episodes"
    );

    let plan = plan_new_episodes(episodes, &seen, options);

    if options.dry_run {
        return Ok(plan);
    }

    for episode in &plan.new_episodes {
        let record_url = episode
            .url
            .as_deref()
            .filter(|url| !seen.enclosure_urls.contains(*url));

        store
            .insert(&episode.guid, record_url, options.feed_name, options.now)
            .await?;
    }

    for guid in &plan.duplicate_enclosures {
        let accepted = plan.new_episodes.iter().any(|e| &e.guid == guid);
        if !accepted && !seen.guids.contains(guid) {
            store
                .insert(guid, None, options.feed_name, options.now)
                .await?;
        }
    }

    Ok(plan)
}
