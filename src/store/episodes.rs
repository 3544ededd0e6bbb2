// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::schema::EpisodeStore;
use super::types::{EpisodeRecord, EpisodeRow, format_timestamp};
use crate::error::StoreError;

impl EpisodeStore {
    /// Append one record
    ///
    /// No uniqueness is enforced here; callers decide whether a row is needed.
    pub async fn insert(
        &self,
        guid: &str,
        enclosure_url: Option<&str>,
        feed_name: Option<&str>,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO episodes (feed_name, guid, enclosure_url, processed) VALUES (?, ?, ?, ?)",
        )
        .bind(feed_name)
        .bind(guid)
        .bind(enclosure_url)
        .bind(format_timestamp(processed_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Distinct GUIDs ever recorded, scoped to one feed when `feed_name` is set
    pub async fn seen_guids(&self, feed_name: Option<&str>) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<(String,)> = match feed_name {
            Some(name) => {
                sqlx::query_as(
                    "SELECT DISTINCT CAST(guid AS TEXT) FROM episodes WHERE guid IS NOT NULL AND feed_name = ?",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT DISTINCT CAST(guid AS TEXT) FROM episodes WHERE guid IS NOT NULL")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(|(guid,)| guid).collect())
    }

    /// Distinct non-null enclosure URLs ever recorded, scoped like [`Self::seen_guids`]
    pub async fn seen_enclosure_urls(
        &self,
        feed_name: Option<&str>,
    ) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<(String,)> = match feed_name {
            Some(name) => {
                sqlx::query_as(
                    "SELECT DISTINCT CAST(enclosure_url AS TEXT) FROM episodes WHERE enclosure_url IS NOT NULL AND feed_name = ?",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT DISTINCT CAST(enclosure_url AS TEXT) FROM episodes WHERE enclosure_url IS NOT NULL",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    /// Delete records processed at or before `now - older_than_days`
    ///
    /// Only the feed's own records are touched when `feed_name` is set, so
    /// feeds sharing a store file keep their own retention. Returns the
    /// number of rows removed. The retention window must exceed the feed's
    /// recency window, otherwise recently posted episodes become eligible
    /// again; that is a configuration responsibility.
    pub async fn evict(
        &self,
        feed_name: Option<&str>,
        older_than_days: u32,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let cutoff = format_timestamp(now - Duration::days(i64::from(older_than_days)));

        let result = match feed_name {
            Some(name) => {
                sqlx::query("DELETE FROM episodes WHERE processed <= ? AND feed_name = ?")
                    .bind(cutoff)
                    .bind(name)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM episodes WHERE processed <= ?")
                    .bind(cutoff)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    /// All records, oldest first, scoped to one feed when `feed_name` is set
    pub async fn records(&self, feed_name: Option<&str>) -> Result<Vec<EpisodeRecord>, StoreError> {
        const SELECT: &str = r#"
            SELECT CAST(feed_name AS TEXT), CAST(guid AS TEXT),
                   CAST(enclosure_url AS TEXT), CAST(processed AS TEXT)
            FROM episodes
            WHERE guid IS NOT NULL AND processed IS NOT NULL
        "#;

        let rows: Vec<EpisodeRow> = match feed_name {
            Some(name) => {
                sqlx::query_as(&format!("{SELECT} AND feed_name = ? ORDER BY processed ASC"))
                    .bind(name)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as(&format!("{SELECT} ORDER BY processed ASC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(EpisodeRecord::try_from).collect()
    }
}
