// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StoreError;

/// Columns every store file must have, with the type used when adding them
const EXPECTED_COLUMNS: [(&str, &str); 4] = [
    ("feed_name", "TEXT"),
    ("guid", "TEXT"),
    ("enclosure_url", "TEXT"),
    ("processed", "TEXT"),
];

/// Identity column name used by store files from the legacy import tool
pub(crate) const LEGACY_FEED_COLUMN: &str = "podcast_name";

/// Durable publication history backed by one SQLite file
#[derive(Clone)]
pub struct EpisodeStore {
    pub(crate) pool: SqlitePool,
}

impl EpisodeStore {
    /// Open (creating if needed) a store file and bring its schema up to date
    ///
    /// `":memory:"` opens a private in-memory store.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|source| {
                StoreError::OpenFailed {
                    path: path.to_string(),
                    source,
                }
            })?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        let store = Self::connect(path, options).await?;
        store.initialize().await?;
        tracing::debug!(path = %path, "Opened episode store");
        Ok(store)
    }

    /// Open an existing store file without creating or migrating it
    pub async fn open_read_only(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().filename(path).read_only(true);

        let store = Self::connect(path, options).await?;
        tracing::debug!(path = %path, "Opened episode store read-only");
        Ok(store)
    }

    async fn connect(path: &str, options: SqliteConnectOptions) -> Result<Self, StoreError> {
        // One connection: a single process owns the store for one feed cycle,
        // and an in-memory database only lives as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::OpenFailed {
                path: path.to_string(),
                source,
            })?;

        Ok(Self { pool })
    }

    /// Column names of the `episodes` table; empty when the table is absent
    pub(crate) async fn column_names(&self) -> Result<HashSet<String>, sqlx::Error> {
        Ok(
            sqlx::query_as::<_, (String,)>("SELECT name FROM pragma_table_info('episodes')")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|(name,)| name)
                .collect(),
        )
    }

    /// Create the `episodes` table if absent and add any missing columns
    ///
    /// Idempotent. Existing rows and columns are never dropped. Runs in one
    /// transaction so a failed migration leaves the file untouched.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.migrate().await.map_err(StoreError::MigrationFailed)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                feed_name TEXT,
                guid TEXT,
                enclosure_url TEXT,
                processed TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        let existing: HashSet<String> =
            sqlx::query_as::<_, (String,)>("SELECT name FROM pragma_table_info('episodes')")
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .map(|(name,)| name)
                .collect();

        for (column, column_type) in EXPECTED_COLUMNS {
            if existing.contains(column) {
                continue;
            }

            tracing::info!(column, "Adding missing column to episode store");
            sqlx::query(&format!(
                "ALTER TABLE episodes ADD COLUMN {column} {column_type}"
            ))
            .execute(&mut *tx)
            .await?;

            if column == "feed_name" && existing.contains(LEGACY_FEED_COLUMN) {
                sqlx::query(
                    "UPDATE episodes SET feed_name = podcast_name WHERE feed_name IS NULL",
                )
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_feed_guid ON episodes(feed_name, guid)")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_episodes_feed_enclosure ON episodes(feed_name, enclosure_url)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_processed ON episodes(processed)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Close the underlying connection, flushing pending writes
    pub async fn close(self) {
        self.pool.close().await;
    }
}
