// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Moving publication history between store files through JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::schema::{EpisodeStore, LEGACY_FEED_COLUMN};
use super::types::{EpisodeRecord, EpisodeRow, format_timestamp, parse_timestamp};
use crate::error::{StoreError, TransferError};

/// One exported store row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEntry {
    #[serde(default)]
    pub podcast_name: Option<String>,
    pub guid: String,
    #[serde(default)]
    pub enclosure_url: Option<String>,
    pub processed_date: String,
}

impl TransferEntry {
    fn from_record(record: EpisodeRecord, podcast_name: &str) -> Self {
        Self {
            podcast_name: Some(
                record
                    .feed_name
                    .unwrap_or_else(|| podcast_name.to_string()),
            ),
            guid: record.guid,
            enclosure_url: record.enclosure_url,
            processed_date: format_timestamp(record.processed_at),
        }
    }
}

/// Export every record of a store file to a JSON array
///
/// The file is opened read-only and its schema is left as found, so older
/// layouts export without being migrated. Records without a feed identity
/// are tagged with `podcast_name`. Returns the number of entries written;
/// an empty store writes no file.
pub async fn export_entries(
    db_path: &Path,
    json_path: &Path,
    podcast_name: &str,
) -> Result<usize, TransferError> {
    if !db_path.exists() {
        return Err(TransferError::DatabaseNotFound(db_path.to_path_buf()));
    }

    let store = EpisodeStore::open_read_only(&db_path.to_string_lossy()).await?;
    let records = stored_records(&store).await;
    store.close().await;
    let records = records?;

    if records.is_empty() {
        return Ok(0);
    }

    let entries: Vec<TransferEntry> = records
        .into_iter()
        .map(|record| TransferEntry::from_record(record, podcast_name))
        .collect();

    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(json_path, json).map_err(|e| TransferError::Io {
        path: json_path.to_path_buf(),
        source: e,
    })?;

    Ok(entries.len())
}

/// Read all records from whatever columns the store file has
async fn stored_records(store: &EpisodeStore) -> Result<Vec<EpisodeRecord>, StoreError> {
    let columns = store.column_names().await?;
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let feed = match (
        columns.contains("feed_name"),
        columns.contains(LEGACY_FEED_COLUMN),
    ) {
        (true, true) => "COALESCE(feed_name, podcast_name)",
        (true, false) => "feed_name",
        (false, true) => "podcast_name",
        (false, false) => "NULL",
    };
    let enclosure = if columns.contains("enclosure_url") {
        "enclosure_url"
    } else {
        "NULL"
    };

    let rows: Vec<EpisodeRow> = sqlx::query_as(&format!(
        r#"
        SELECT CAST({feed} AS TEXT), CAST(guid AS TEXT),
               CAST({enclosure} AS TEXT), CAST(processed AS TEXT)
        FROM episodes
        WHERE guid IS NOT NULL AND processed IS NOT NULL
        ORDER BY processed ASC
        "#
    ))
    .fetch_all(&store.pool)
    .await?;

    rows.into_iter().map(EpisodeRecord::try_from).collect()
}

/// Import entries from a JSON array into a store file, creating it if needed
///
/// Entries without a `podcast_name` are tagged with the given name. Returns
/// the number of entries inserted.
pub async fn import_entries(
    json_path: &Path,
    db_path: &Path,
    podcast_name: &str,
) -> Result<usize, TransferError> {
    if !json_path.exists() {
        return Err(TransferError::EntriesFileNotFound(json_path.to_path_buf()));
    }

    let content = std::fs::read_to_string(json_path).map_err(|e| TransferError::Io {
        path: json_path.to_path_buf(),
        source: e,
    })?;
    let entries: Vec<TransferEntry> =
        serde_json::from_str(&content).map_err(|e| TransferError::JsonParseFailed {
            path: json_path.to_path_buf(),
            source: e,
        })?;

    if entries.is_empty() {
        return Ok(0);
    }

    let store = EpisodeStore::open(&db_path.to_string_lossy()).await?;

    for entry in &entries {
        let feed_name = entry
            .podcast_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(podcast_name);
        let processed_at = parse_timestamp(&entry.processed_date)?;

        store
            .insert(
                &entry.guid,
                entry.enclosure_url.as_deref(),
                Some(feed_name),
                processed_at,
            )
            .await?;
    }

    store.close().await;
    tracing::info!(count = entries.len(), path = %db_path.display(), "Imported entries");

    Ok(entries.len())
}
