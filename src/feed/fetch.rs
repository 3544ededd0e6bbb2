// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bytes::Bytes;
use url::Url;

use crate::error::FeedError;
use crate::http::HttpClient;

use super::parse::{FetchedEpisode, parse_feed};

/// Fetch raw feed bytes from a URL (without parsing)
pub async fn fetch_feed_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    user_agent: &str,
) -> Result<Bytes, FeedError> {
    let bytes = client
        .get_bytes(url, user_agent)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;
    Ok(bytes)
}

/// Fetch and parse a podcast feed, returning at most `max_episodes`
/// episodes ordered newest first
pub async fn fetch_episodes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    max_episodes: usize,
    user_agent: &str,
) -> Result<Vec<FetchedEpisode>, FeedError> {
    Url::parse(url)?;
    let bytes = fetch_feed_bytes(client, url, user_agent).await?;
    parse_feed(&bytes, max_episodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingClient {
        body: &'static str,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn get_bytes(&self, url: &str, user_agent: &str) -> Result<Bytes, reqwest::Error> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), user_agent.to_string()));
            Ok(Bytes::from_static(self.body.as_bytes()))
        }
    }

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <description>Test</description>
    <item>
      <title>Episode 1</title>
      <guid>ep1</guid>
      <pubDate>Mon, 01 Jan 2024 12:00:00 +0000</pubDate>
      <enclosure url="https://example.com/ep1.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn fetch_episodes_passes_user_agent() {
        let client = RecordingClient {
            body: FEED,
            seen: Mutex::new(Vec::new()),
        };

        let episodes = fetch_episodes(&client, "https://example.com/feed.xml", 10, "podpost/test")
            .await
            .unwrap();

        assert_eq!(episodes.len(), 1);
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].0, "https://example.com/feed.xml");
        assert_eq!(seen[0].1, "podpost/test");
    }

    #[tokio::test]
    async fn fetch_episodes_rejects_invalid_url() {
        let client = RecordingClient {
            body: FEED,
            seen: Mutex::new(Vec::new()),
        };

        let result = fetch_episodes(&client, "not a url", 10, "podpost/test").await;

        assert!(matches!(result, Err(FeedError::InvalidUrl(_))));
        assert!(client.seen.lock().unwrap().is_empty());
    }
}
