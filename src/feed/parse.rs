// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::FeedError;

/// A single episode as delivered by a podcast feed
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedEpisode {
    pub guid: String,
    pub published: DateTime<Utc>,
    pub title: String,
    /// Raw description markup
    pub description: String,
    pub enclosure_url: Option<String>,
    pub duration: Option<Duration>,
}

/// Parse RSS feed XML bytes into episodes, newest first
///
/// At most `max_episodes` episodes are returned. Items without an enclosure
/// or a usable publication date are skipped.
pub fn parse_feed(xml_bytes: &[u8], max_episodes: usize) -> Result<Vec<FetchedEpisode>, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let mut episodes: Vec<FetchedEpisode> = channel.items().iter().filter_map(parse_episode).collect();

    // Stable sort keeps feed order for episodes sharing a timestamp
    episodes.sort_by(|a, b| b.published.cmp(&a.published));
    episodes.truncate(max_episodes);

    Ok(episodes)
}

fn parse_episode(item: &rss::Item) -> Option<FetchedEpisode> {
    let title = item.title().unwrap_or_default().to_string();

    let Some(enclosure) = item.enclosure() else {
        tracing::debug!(title = %title, "Skipping feed item without enclosure");
        return None;
    };
    let enclosure_url = enclosure.url().trim();

    let Some(published) = item.pub_date().and_then(parse_date) else {
        tracing::debug!(title = %title, "Skipping feed item without a usable pubDate");
        return None;
    };

    let guid = item
        .guid()
        .map(|g| g.value().trim().to_string())
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| enclosure_url.to_string());

    let itunes = item.itunes_ext();

    let description = item
        .content()
        .or_else(|| item.description())
        .or_else(|| itunes.and_then(|ext| ext.summary()))
        .unwrap_or_default()
        .to_string();

    Some(FetchedEpisode {
        guid,
        published: published.with_timezone(&Utc),
        title,
        description,
        enclosure_url: Some(enclosure_url.to_string()).filter(|u| !u.is_empty()),
        duration: itunes.and_then(|ext| ext.duration()).and_then(parse_duration),
    })
}

fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let date_str = date_str.trim();
    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .or_else(|| parse_relaxed_date(date_str))
}

/// Try to parse dates that don't strictly conform to RFC 2822
fn parse_relaxed_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%a, %d %b %Y %H:%M %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    formats
        .iter()
        .find_map(|format| DateTime::parse_from_str(date_str, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(date_str).ok())
}

/// Parse an `itunes:duration` value: `SS`, `MM:SS` or `HH:MM:SS`
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut seconds: u64 = 0;
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    for part in parts {
        // Fractional seconds are dropped
        let whole = part.split('.').next().unwrap_or(part);
        let n: u64 = whole.trim().parse().ok()?;
        seconds = seconds * 60 + n;
    }

    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast for unit testing</description>
    <link>https://example.com</link>
    <item>
      <title>Episode 1</title>
      <description><![CDATA[<p>First episode</p>]]></description>
      <pubDate>Mon, 01 Jan 2024 12:00:00 +0000</pubDate>
      <guid>ep1-guid</guid>
      <enclosure url="https://example.com/ep1.mp3" length="1234567" type="audio/mpeg"/>
      <itunes:duration>30:00</itunes:duration>
    </item>
    <item>
      <title>Episode 2</title>
      <pubDate>Tue, 02 Jan 2024 12:00:00 +0000</pubDate>
      <enclosure url="https://example.com/ep2.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>Undated</title>
      <guid>undated</guid>
      <enclosure url="https://example.com/undated.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>No Audio</title>
      <guid>no-audio</guid>
      <pubDate>Wed, 03 Jan 2024 12:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parse_feed_orders_episodes_newest_first() {
        let episodes = parse_feed(SAMPLE_FEED.as_bytes(), 50).unwrap();

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Episode 2");
        assert_eq!(episodes[1].title, "Episode 1");
    }

    #[test]
    fn parse_feed_extracts_episode_fields() {
        let episodes = parse_feed(SAMPLE_FEED.as_bytes(), 50).unwrap();
        let ep1 = &episodes[1];

        assert_eq!(ep1.guid, "ep1-guid");
        assert_eq!(ep1.description, "<p>First episode</p>");
        assert_eq!(ep1.enclosure_url.as_deref(), Some("https://example.com/ep1.mp3"));
        assert_eq!(ep1.duration, Some(Duration::from_secs(30 * 60)));
        assert_eq!(ep1.published.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn parse_feed_falls_back_to_enclosure_url_for_guid() {
        let episodes = parse_feed(SAMPLE_FEED.as_bytes(), 50).unwrap();
        assert_eq!(episodes[0].guid, "https://example.com/ep2.mp3");
        assert!(episodes[0].duration.is_none());
    }

    #[test]
    fn parse_feed_applies_episode_cap_after_sorting() {
        let episodes = parse_feed(SAMPLE_FEED.as_bytes(), 1).unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].title, "Episode 2");
    }

    #[test]
    fn parse_feed_rejects_invalid_xml() {
        let result = parse_feed(b"this is not a feed", 10);
        assert!(matches!(result, Err(FeedError::ParseFailed(_))));
    }

    #[test]
    fn parse_date_accepts_relaxed_and_rfc3339_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        for value in [
            "Mon, 01 Jan 2024 12:00:00 +0000",
            "Mon, 01 Jan 2024 12:00 +0000",
            "2024-01-01T12:00:00+00:00",
            "2024-01-01 12:00:00 +0000",
            "2024-01-01T12:00:00.000Z",
        ] {
            let parsed = parse_date(value).map(|dt| dt.with_timezone(&Utc));
            assert_eq!(parsed, Some(expected), "{value}");
        }

        assert_eq!(parse_date("sometime last week"), None);
    }

    #[test]
    fn parse_duration_accepts_common_forms() {
        assert_eq!(parse_duration("95"), Some(Duration::from_secs(95)));
        assert_eq!(parse_duration("01:35"), Some(Duration::from_secs(95)));
        assert_eq!(parse_duration("1:01:35"), Some(Duration::from_secs(3695)));
        assert_eq!(parse_duration("1:01:35.5"), Some(Duration::from_secs(3695)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("about an hour"), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
    }
}
