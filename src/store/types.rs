// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::StoreError;

/// Layout used for the `processed` column. Lexical order matches time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One row of publication history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRecord {
    /// Feed identity; `None` for rows written in single-feed mode
    pub feed_name: Option<String>,
    pub guid: String,
    pub enclosure_url: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Raw row as selected from the `episodes` table
pub(crate) type EpisodeRow = (Option<String>, String, Option<String>, String);

impl TryFrom<EpisodeRow> for EpisodeRecord {
    type Error = StoreError;

    fn try_from((feed_name, guid, enclosure_url, processed): EpisodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            feed_name,
            guid,
            enclosure_url,
            processed_at: parse_timestamp(&processed)?,
        })
    }
}

/// Render a timestamp the way the store persists it
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp
///
/// Accepts the canonical layout, second-precision and `T`-separated
/// variants, and RFC 3339 with an offset.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    let trimmed = value.trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_timestamp_uses_microsecond_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-09 07:05:01.000000");
    }

    #[test]
    fn parse_timestamp_accepts_legacy_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();

        assert_eq!(parse_timestamp("2024-03-09 07:05:01.000000").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09 07:05:01").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09T07:05:01").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09T09:05:01+02:00").unwrap(), expected);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, StoreError::InvalidTimestamp { value } if value == "yesterday"));
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }
}
