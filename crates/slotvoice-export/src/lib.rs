//! Export logged exchanges to CSV.
//!
//! Records are selected by store key, either by the date prefix of current
//! keys (`Y-M-D/...`, inclusive range) or, for the legacy layout, by a
//! `win`/`lose` prefix at the top level. Each selected record becomes one
//! CSV row:
//!
//! ```text
//! userId,timestamp,prompt,response,outcome,gamesPlayed,winStreak,loseStreak,speechOrReels
//! ```

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeZone};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use slotvoice::store::{ExchangeRecord, ExchangeStore, key_date};
use tracing::{debug, info, warn};

/// Column names, in output order.
pub const CSV_HEADER: [&str; 9] = [
    "userId",
    "timestamp",
    "prompt",
    "response",
    "outcome",
    "gamesPlayed",
    "winStreak",
    "loseStreak",
    "speechOrReels",
];

/// Output file used when none is given.
pub const DEFAULT_OUTPUT: &str = "output.csv";

/// Concurrent store reads while exporting.
const READ_CONCURRENCY: usize = 8;

/// Which records to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportFilter {
    /// Keys written by the older client: `win...` / `lose...` at the top level.
    Legacy,
    /// Keys whose date prefix falls within `start..=end` (`end` open when `None`).
    DateRange {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
}

impl ExportFilter {
    /// Whether the record stored under `key` should be exported.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            ExportFilter::Legacy => key.starts_with("win") || key.starts_with("lose"),
            ExportFilter::DateRange { start, end } => match key_date(key) {
                Some(date) => date >= *start && end.is_none_or(|end| date <= end),
                None => false,
            },
        }
    }
}

/// Parse a `YYYY-MM-DD` date (an RFC 3339 timestamp is accepted and
/// truncated to its date).
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| format!("invalid date '{raw}' (expected YYYY-MM-DD)"))
}

/// Resolve the output path: `.csv` is appended to a name without a dot.
pub fn output_path(name: Option<&str>) -> PathBuf {
    match name {
        Some(name) if name.contains('.') => PathBuf::from(name),
        Some(name) => PathBuf::from(format!("{name}.csv")),
        None => PathBuf::from(DEFAULT_OUTPUT),
    }
}

/// One CSV row.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub user_id: String,
    pub timestamp: String,
    pub prompt: String,
    pub response: String,
    pub outcome: String,
    pub games_played: u32,
    pub win_streak: u32,
    pub lose_streak: u32,
    pub speech_or_reels: String,
}

impl ExportRow {
    /// Flatten a record, formatting its timestamp in `tz`.
    pub fn from_record<Tz>(record: &ExchangeRecord, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let session = &record.session;
        Self {
            user_id: session.user_id.clone().unwrap_or_default(),
            timestamp: format_timestamp(session.timestamp, tz),
            prompt: record.prompt.clone(),
            response: record.response.clone(),
            outcome: record
                .outcome()
                .map(|o| o.as_str().to_string())
                .unwrap_or_default(),
            games_played: session.games_played,
            win_streak: session.win_streak,
            lose_streak: session.lose_streak,
            speech_or_reels: session
                .prior_speech
                .clone()
                .or_else(|| session.reels_display.clone())
                .unwrap_or_default(),
        }
    }
}

/// Epoch milliseconds as a local-style date and time, e.g.
/// `3/5/2024, 1:33:20 PM`. Missing or zero timestamps format as empty.
pub fn format_timestamp<Tz>(millis: Option<i64>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    millis
        .filter(|ms| *ms != 0)
        .and_then(|ms| tz.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string())
        .unwrap_or_default()
}

/// Read every record selected by `filter`, in key order.
///
/// Listing failures are errors. A record that cannot be read or parsed is
/// skipped with a warning.
pub async fn read_records(
    store: &dyn ExchangeStore,
    filter: &ExportFilter,
) -> Result<Vec<ExchangeRecord>, String> {
    let keys: Vec<String> = store
        .list()
        .await?
        .into_iter()
        .filter(|key| filter.matches(key))
        .collect();
    debug!("{} key(s) selected for export", keys.len());

    let records = stream::iter(keys)
        .map(|key| async move {
            let body = store.get(&key).await;
            (key, body)
        })
        .buffered(READ_CONCURRENCY)
        .filter_map(|(key, body)| async move {
            let body = match body {
                Ok(body) => body,
                Err(e) => {
                    warn!("Skipping {key}: {e}");
                    return None;
                }
            };
            match serde_json::from_str::<ExchangeRecord>(&body) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping {key}: malformed record: {e}");
                    None
                }
            }
        })
        .collect::<Vec<_>>()
        .await;

    Ok(records)
}

/// Write the header and `rows` as CSV.
pub fn write_csv<W: io::Write>(writer: W, rows: &[ExportRow]) -> Result<(), String> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(CSV_HEADER)
        .map_err(|e| format!("failed to write CSV header: {e}"))?;
    for row in rows {
        csv.serialize(row)
            .map_err(|e| format!("failed to write CSV row: {e}"))?;
    }
    csv.flush()
        .map_err(|e| format!("failed to flush CSV output: {e}"))
}

/// Export the records selected by `filter` to `path`, formatting
/// timestamps in `tz`. Returns the number of rows written.
pub async fn export_to_file<Tz>(
    store: &dyn ExchangeStore,
    filter: &ExportFilter,
    path: &Path,
    tz: &Tz,
) -> Result<usize, String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let records = read_records(store, filter).await?;
    let rows: Vec<ExportRow> = records
        .iter()
        .map(|record| ExportRow::from_record(record, tz))
        .collect();

    let file = std::fs::File::create(path)
        .map_err(|e| format!("failed to create {}: {e}", path.display()))?;
    write_csv(io::BufWriter::new(file), &rows)?;

    info!("Wrote {} row(s) to {}", rows.len(), path.display());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use slotvoice::session::{Outcome, PlaySession};
    use slotvoice::store::{FsStore, MemoryStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(user: &str, ts: i64) -> ExchangeRecord {
        let session = PlaySession::partial(Outcome::Win, "Spinning now.")
            .with_user_id(user)
            .with_timestamp(ts)
            .with_counts(5, 2, 0);
        ExchangeRecord::new(&session, Outcome::Win, "Cheer them on.", "Three in a row!")
    }

    async fn put(store: &dyn ExchangeStore, key: &str, body: &str) {
        store.put(key, body.to_string()).await.unwrap();
    }

    #[test]
    fn date_range_is_inclusive() {
        let filter = ExportFilter::DateRange {
            start: date(2024, 3, 1),
            end: Some(date(2024, 3, 5)),
        };
        assert!(filter.matches("2024-3-1/u1/win1.json"));
        assert!(filter.matches("2024-03-05/u1/lose2.json"));
        assert!(!filter.matches("2024-3-6/u1/win3.json"));
        assert!(!filter.matches("2024-2-29/u1/win4.json"));
        assert!(!filter.matches("win1700000000000.json"));
    }

    #[test]
    fn open_ended_range() {
        let filter = ExportFilter::DateRange {
            start: date(2024, 3, 1),
            end: None,
        };
        assert!(filter.matches("2031-1-1/u1/win1.json"));
        assert!(!filter.matches("garbage/u1/win1.json"));
    }

    #[test]
    fn legacy_matches_top_level_prefix() {
        assert!(ExportFilter::Legacy.matches("win1700000000000.json"));
        assert!(ExportFilter::Legacy.matches("lose1700000000000.json"));
        assert!(!ExportFilter::Legacy.matches("2024-3-1/u1/win1.json"));
    }

    #[test]
    fn parses_dates() {
        assert_eq!(parse_date("2024-03-05").unwrap(), date(2024, 3, 5));
        assert_eq!(
            parse_date("2024-03-05T10:00:00Z").unwrap(),
            date(2024, 3, 5)
        );
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn output_path_defaults() {
        assert_eq!(output_path(None), PathBuf::from("output.csv"));
        assert_eq!(output_path(Some("march")), PathBuf::from("march.csv"));
        assert_eq!(output_path(Some("march.txt")), PathBuf::from("march.txt"));
    }

    #[test]
    fn timestamps_format_in_given_zone() {
        assert_eq!(
            format_timestamp(Some(1_709_645_600_000), &Utc),
            "3/5/2024, 1:33:20 PM"
        );
        assert_eq!(format_timestamp(None, &Utc), "");
        assert_eq!(format_timestamp(Some(0), &Utc), "");
    }

    #[test]
    fn row_prefers_speech_then_reels() {
        let row = ExportRow::from_record(&record("u1", 1_709_645_600_000), &Utc);
        assert_eq!(row.user_id, "u1");
        assert_eq!(row.outcome, "win");
        assert_eq!(row.games_played, 5);
        assert_eq!(row.speech_or_reels, "Spinning now.");

        let full = PlaySession::full("🍒🍋🔔", 0, 90);
        let rec = ExchangeRecord::new(&full, Outcome::Lose, "p", "r");
        let row = ExportRow::from_record(&rec, &Utc);
        assert_eq!(row.speech_or_reels, "🍒🍋🔔");
        assert_eq!(row.outcome, "lose");
        assert_eq!(row.user_id, "");
    }

    #[test]
    fn csv_has_header_and_quotes_fields() {
        let mut row = ExportRow::from_record(&record("u1", 1_709_645_600_000), &Utc);
        row.response = "Big win, again!".into();

        let mut out = Vec::new();
        write_csv(&mut out, &[row]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "userId,timestamp,prompt,response,outcome,gamesPlayed,winStreak,loseStreak,speechOrReels"
        );
        assert_eq!(
            lines.next().unwrap(),
            "u1,\"3/5/2024, 1:33:20 PM\",Cheer them on.,\"Big win, again!\",win,5,2,0,Spinning now."
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_export_still_writes_header() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn reads_selected_records_and_skips_malformed() {
        let store = MemoryStore::new();
        let good = serde_json::to_string(&record("u1", 1)).unwrap();
        put(&store, "2024-3-2/u1/win1.json", &good).await;
        put(&store, "2024-3-3/u1/win2.json", "{not json").await;
        put(&store, "2024-4-1/u1/win3.json", &good).await;

        let filter = ExportFilter::DateRange {
            start: date(2024, 3, 1),
            end: Some(date(2024, 3, 31)),
        };
        let records = read_records(&store, &filter).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn legacy_records_use_old_field_names() {
        let store = MemoryStore::new();
        let legacy = r#"{"userId":"old","timestamp":1700000000000,"games":7,"wins":0,"losses":3,
            "status":"lose","speech":"So close.","prompt":"Console them.","response":"Next time!"}"#;
        put(&store, "lose1700000000000.json", legacy).await;

        let records = read_records(&store, &ExportFilter::Legacy).await.unwrap();
        assert_eq!(records.len(), 1);
        let row = ExportRow::from_record(&records[0], &Utc);
        assert_eq!(row.games_played, 7);
        assert_eq!(row.lose_streak, 3);
        assert_eq!(row.outcome, "lose");
        assert_eq!(row.speech_or_reels, "So close.");
    }

    #[tokio::test]
    async fn exports_from_filesystem_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("prompts")).unwrap();
        let body = serde_json::to_string(&record("u1", 1_709_645_600_000)).unwrap();
        put(&store, "2024-3-5/u1/win1709645600000.json", &body).await;
        put(&store, "2024-3-5/u2/win1709645600001.json", &body).await;

        let out = dir.path().join("march.csv");
        let filter = ExportFilter::DateRange {
            start: date(2024, 3, 5),
            end: None,
        };
        let written = export_to_file(&store, &filter, &out, &Utc).await.unwrap();
        assert_eq!(written, 2);

        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("Three in a row!"));
    }
}
