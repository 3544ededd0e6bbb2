// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end feed cycles against mock feed and Mastodon servers.

use std::path::Path;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use podpost::{
    EpisodeStore, FeedProfile, MastodonClient, MastodonSettings, NoopReporter, PublishError,
    Publisher, ReqwestClient, RunOptions, resolve_access_token, run_feed, run_feeds,
};

fn item(guid: &str, url: &str, hours_ago: i64) -> String {
    let published = (Utc::now() - Duration::hours(hours_ago)).to_rfc2822();
    format!(
        r#"<item>
      <title>Episode {guid}</title>
      <guid isPermaLink="false">{guid}</guid>
      <pubDate>{published}</pubDate>
      <description>Notes for {guid}</description>
      <enclosure url="{url}" type="audio/mpeg" length="1"/>
    </item>"#
    )
}

fn rss(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Integration Show</title>
    <link>https://example.com</link>
    <description>Test feed</description>
    {}
  </channel>
</rss>"#,
        items.join("\n")
    )
}

async fn serve_feed(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("user-agent", podpost::USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn profile(dir: &TempDir, server: &MockServer, name: Option<&str>, route: &str) -> FeedProfile {
    FeedProfile {
        name: name.map(str::to_string),
        podcast_name: Some("Integration Show".to_string()),
        feed_url: format!("{}{}", server.uri(), route),
        recent_days: 5,
        max_episodes: 50,
        guid_filter: None,
        database_file: dir.path().join("feed_info.sqlite3"),
        database_clean_days: 90,
        template_path: dir.path().join("post.txt.jinja"),
        description_max_length: 275,
        mastodon: MastodonSettings {
            api_url: server.uri(),
            secret: SecretString::from("integration-token"),
        },
    }
}

fn mastodon(profile: &FeedProfile) -> Result<Box<dyn Publisher>, PublishError> {
    let token = resolve_access_token(profile.mastodon.secret.expose_secret())?;
    Ok(Box::new(MastodonClient::new(
        reqwest::Client::new(),
        &profile.mastodon.api_url,
        token,
    )?))
}

async fn open_store(path: &Path) -> EpisodeStore {
    EpisodeStore::open(&path.to_string_lossy()).await.unwrap()
}

#[tokio::test]
async fn cycle_posts_each_new_episode_exactly_once() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    serve_feed(
        &server,
        "/feed.xml",
        rss(&[
            item("A2", "https://cdn.example/ep2.mp3", 2),
            item("A1", "https://cdn.example/ep1.mp3", 30),
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statuses"))
        .and(header("authorization", "Bearer integration-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(2)
        .mount(&server)
        .await;

    let client = ReqwestClient::new();
    let profiles = vec![profile(&dir, &server, None, "/feed.xml")];
    let reporter = NoopReporter::shared();

    let first = run_feeds(&client, &profiles, mastodon, &RunOptions::default(), &reporter).await;
    let second = run_feeds(&client, &profiles, mastodon, &RunOptions::default(), &reporter).await;

    let first = first[0].result.as_ref().unwrap();
    assert_eq!(first.fetched, 2);
    assert_eq!(first.new_episodes, 2);
    assert_eq!(first.posted, 2);

    let second = second[0].result.as_ref().unwrap();
    assert_eq!(second.new_episodes, 0);
    assert_eq!(second.posted, 0);
}

#[tokio::test]
async fn old_episodes_are_never_posted() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    serve_feed(
        &server,
        "/feed.xml",
        rss(&[item("OLD", "https://cdn.example/old.mp3", 24 * 10)]),
    )
    .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let profiles = vec![profile(&dir, &server, None, "/feed.xml")];
    let outcomes = run_feeds(
        &ReqwestClient::new(),
        &profiles,
        mastodon,
        &RunOptions::default(),
        &NoopReporter::shared(),
    )
    .await;

    let summary = outcomes[0].result.as_ref().unwrap();
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.new_episodes, 0);

    let store = open_store(&profiles[0].database_file).await;
    assert!(store.records(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_post_stays_recorded() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    serve_feed(
        &server,
        "/feed.xml",
        rss(&[item("A1", "https://cdn.example/ep1.mp3", 1)]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statuses"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ReqwestClient::new();
    let profile = profile(&dir, &server, None, "/feed.xml");
    let publisher = mastodon(&profile).unwrap();
    let reporter = NoopReporter::shared();

    let first = run_feed(&client, publisher.as_ref(), &profile, &RunOptions::default(), &reporter)
        .await
        .unwrap();
    assert_eq!(first.failed_posts, 1);

    let second = run_feed(&client, publisher.as_ref(), &profile, &RunOptions::default(), &reporter)
        .await
        .unwrap();
    assert_eq!(second.new_episodes, 0);

    let store = open_store(&profile.database_file).await;
    let records = store.records(None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].guid, "A1");
    assert_eq!(records[0].enclosure_url.as_deref(), Some("https://cdn.example/ep1.mp3"));
}

#[tokio::test]
async fn republished_episode_with_known_url_is_recorded_guid_only() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    serve_feed(
        &server,
        "/feed.xml",
        rss(&[item("A1-new", "https://cdn.example/ep1.mp3", 1)]),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_string_contains("A1-new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let profile = profile(&dir, &server, None, "/feed.xml");
    {
        let store = open_store(&profile.database_file).await;
        store
            .insert(
                "A1",
                Some("https://cdn.example/ep1.mp3"),
                None,
                Utc::now() - Duration::days(1),
            )
            .await
            .unwrap();
        store.close().await;
    }

    let publisher = mastodon(&profile).unwrap();
    let summary = run_feed(
        &ReqwestClient::new(),
        publisher.as_ref(),
        &profile,
        &RunOptions::default(),
        &NoopReporter::shared(),
    )
    .await
    .unwrap();
    assert_eq!(summary.posted, 1);

    let store = open_store(&profile.database_file).await;
    let records = store.records(None).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].guid, "A1-new");
    assert_eq!(records[1].enclosure_url, None);
}

#[tokio::test]
async fn feeds_sharing_a_store_keep_separate_histories() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    let body = rss(&[item("shared-guid", "https://cdn.example/shared.mp3", 1)]);
    serve_feed(&server, "/alpha.xml", body.clone()).await;
    serve_feed(&server, "/beta.xml", body).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let profiles = vec![
        profile(&dir, &server, Some("alpha"), "/alpha.xml"),
        profile(&dir, &server, Some("beta"), "/beta.xml"),
    ];

    let outcomes = run_feeds(
        &ReqwestClient::new(),
        &profiles,
        mastodon,
        &RunOptions::default(),
        &NoopReporter::shared(),
    )
    .await;

    assert!(outcomes.iter().all(|o| o.is_success()));

    let store = open_store(&profiles[0].database_file).await;
    assert_eq!(store.records(Some("alpha")).await.unwrap().len(), 1);
    assert_eq!(store.records(Some("beta")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_feed_fails_without_stopping_others() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    serve_feed(
        &server,
        "/working.xml",
        rss(&[item("W1", "https://cdn.example/w1.mp3", 1)]),
    )
    .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let profiles = vec![
        profile(&dir, &server, Some("broken"), "/broken.xml"),
        profile(&dir, &server, Some("working"), "/working.xml"),
    ];

    let outcomes = run_feeds(
        &ReqwestClient::new(),
        &profiles,
        mastodon,
        &RunOptions::default(),
        &NoopReporter::shared(),
    )
    .await;

    assert!(!outcomes[0].is_success());
    assert_eq!(
        outcomes[0].result.as_ref().unwrap_err().stage,
        podpost::FeedStage::Fetched
    );
    assert_eq!(outcomes[1].result.as_ref().unwrap().posted, 1);
}

#[tokio::test]
async fn cleanup_evicts_records_past_retention() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    serve_feed(&server, "/feed.xml", rss(&[])).await;

    let profile = profile(&dir, &server, None, "/feed.xml");
    {
        let store = open_store(&profile.database_file).await;
        store
            .insert("ancient", None, None, Utc::now() - Duration::days(120))
            .await
            .unwrap();
        store
            .insert("recent", None, None, Utc::now() - Duration::days(10))
            .await
            .unwrap();
        store.close().await;
    }

    let publisher = mastodon(&profile).unwrap();
    let client = ReqwestClient::new();
    let reporter = NoopReporter::shared();

    let skipped = RunOptions {
        skip_cleanup: true,
        ..Default::default()
    };
    let summary = run_feed(&client, publisher.as_ref(), &profile, &skipped, &reporter)
        .await
        .unwrap();
    assert_eq!(summary.evicted, 0);

    let summary = run_feed(&client, publisher.as_ref(), &profile, &RunOptions::default(), &reporter)
        .await
        .unwrap();
    assert_eq!(summary.evicted, 1);

    let store = open_store(&profile.database_file).await;
    let guids: Vec<_> = store
        .records(None)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.guid)
        .collect();
    assert_eq!(guids, vec!["recent".to_string()]);
}
