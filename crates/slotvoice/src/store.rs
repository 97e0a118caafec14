//! Append-only log of generated exchanges in an object store.
//!
//! Each exchange is one JSON object stored under a key of the form
//! `{Y}-{M}-{D}/{user}/{win|lose}{epochMillis}.json` (month and day are not
//! zero-padded). The store itself is opaque: [`ExchangeStore`] only needs
//! put/get/list. [`FsStore`] maps keys onto a directory tree;
//! [`MemoryStore`] keeps everything in a map.
//!
//! Writes through [`record_exchange`] are best effort: failures are logged
//! and dropped so the commentary still reaches the player.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::session::{Outcome, PlaySession};

/// Boxed future returned by [`ExchangeStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

/// Minimal key/value object store.
pub trait ExchangeStore: Send + Sync {
    /// Write `body` under `key`, replacing any existing object.
    fn put<'a>(&'a self, key: &'a str, body: String) -> StoreFuture<'a, ()>;

    /// Read the object stored under `key`.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, String>;

    /// All keys in the store, sorted.
    fn list(&self) -> StoreFuture<'_, Vec<String>>;
}

// ── ExchangeRecord ─────────────────────────────────────────────────

/// One persisted exchange: the session that produced it plus the chosen
/// instruction and the final response text.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExchangeRecord {
    #[serde(flatten)]
    pub session: PlaySession,
    /// The instruction template that was sent.
    pub prompt: String,
    /// The text returned to the caller.
    pub response: String,
}

impl ExchangeRecord {
    /// Build a record, filling the session's outcome with the one the
    /// messages described (FULL sessions only carry a payout).
    pub fn new(
        session: &PlaySession,
        outcome: Outcome,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        let mut session = session.clone();
        session.outcome = Some(outcome);
        Self {
            session,
            prompt: prompt.into(),
            response: response.into(),
        }
    }

    /// The recorded outcome, derived from the payout for records that lack one.
    pub fn outcome(&self) -> Option<Outcome> {
        self.session
            .outcome
            .or_else(|| self.session.payout.map(Outcome::from_payout))
    }
}

// ── Keys ───────────────────────────────────────────────────────────

/// Keep ASCII alphanumerics only; `"default"` when nothing is left.
pub fn sanitize_user_id(user_id: Option<&str>) -> String {
    let cleaned: String = user_id
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

/// Storage key for an exchange written at `now`.
pub fn storage_key(outcome: Outcome, user_id: Option<&str>, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}{}.json",
        now.format("%Y-%-m-%-d"),
        sanitize_user_id(user_id),
        outcome.as_str(),
        now.timestamp_millis()
    )
}

/// Parse the date segment (`Y-M-D`, padding optional) of a storage key.
pub fn key_date(key: &str) -> Option<NaiveDate> {
    let segment = key.split('/').next()?;
    let mut parts = segment.split('-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

// ── Recording ──────────────────────────────────────────────────────

/// Persist an exchange. Never fails: errors are logged at `warn` and
/// swallowed. Returns the key when the write succeeded.
pub async fn record_exchange(store: &dyn ExchangeStore, record: &ExchangeRecord) -> Option<String> {
    let outcome = record.outcome().unwrap_or(Outcome::Lose);
    let key = storage_key(outcome, record.session.user_id.as_deref(), Utc::now());

    let body = match serde_json::to_string(record) {
        Ok(body) => body,
        Err(e) => {
            warn!("Storage error: failed to serialize exchange: {e}");
            return None;
        }
    };

    match store.put(&key, body).await {
        Ok(()) => {
            debug!("Stored exchange at {key}");
            Some(key)
        }
        Err(e) => {
            warn!("Storage error: {e}");
            None
        }
    }
}

// ── FsStore ────────────────────────────────────────────────────────

/// Object store backed by a directory. Keys are relative paths using `/`.
///
/// Layout:
/// ```text
/// root/
///   2024-3-7/
///     player1/
///       win1709827200000.json
/// ```
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path inside the root, rejecting escapes.
    fn path_for(&self, key: &str) -> Result<PathBuf, String> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(format!("invalid storage key '{key}'"));
        }
        Ok(self.root.join(relative))
    }
}

impl ExchangeStore for FsStore {
    fn put<'a>(&'a self, key: &'a str, body: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            let dir = path
                .parent()
                .ok_or_else(|| format!("invalid storage key '{key}'"))?;
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| format!("Failed to create directory for {key}: {e}"))?;

            // Atomic write: temp file in the same directory, then rename.
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let tmp_path = dir.join(format!(".{file_name}.tmp"));
            tokio::fs::write(&tmp_path, body)
                .await
                .map_err(|e| format!("Failed to write {key}: {e}"))?;
            tokio::fs::rename(&tmp_path, &path)
                .await
                .map_err(|e| format!("Failed to rename {key}: {e}"))?;
            Ok(())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| format!("Failed to read {key}: {e}"))
        })
    }

    fn list(&self) -> StoreFuture<'_, Vec<String>> {
        let root = self.root.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || list_keys(&root))
                .await
                .map_err(|e| format!("Listing task failed: {e}"))?
        })
    }
}

/// Walk `root` and return every regular file as a `/`-separated key,
/// skipping in-flight temp files.
fn list_keys(root: &Path) -> Result<Vec<String>, String> {
    let mut keys = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries =
            std::fs::read_dir(&dir).map_err(|e| format!("Failed to read {}: {e}", dir.display()))?;
        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {e}"))?;
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') && name.ends_with(".tmp") {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(root) {
                let key: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                keys.push(key.join("/"));
            }
        }
    }

    keys.sort();
    Ok(keys)
}

// ── MemoryStore ────────────────────────────────────────────────────

/// In-process store. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExchangeStore for MemoryStore {
    fn put<'a>(&'a self, key: &'a str, body: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.objects
                .lock()
                .map_err(|_| "memory store lock poisoned".to_string())?
                .insert(key.to_string(), body);
            Ok(())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            self.objects
                .lock()
                .map_err(|_| "memory store lock poisoned".to_string())?
                .get(key)
                .cloned()
                .ok_or_else(|| format!("no object under '{key}'"))
        })
    }

    fn list(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            let objects = self
                .objects
                .lock()
                .map_err(|_| "memory store lock poisoned".to_string())?;
            Ok(objects.keys().cloned().collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> ExchangeRecord {
        let session = PlaySession::full("🍒🍒🍒", 30, 130)
            .with_user_id("player-1")
            .with_timestamp(1_700_000_000_000)
            .with_counts(8, 1, 0);
        ExchangeRecord::new(&session, Outcome::Win, "Be funny.", "🍒🍒🍒<pause:200ms>Nice!")
    }

    #[test]
    fn sanitize_strips_non_alphanumerics() {
        assert_eq!(sanitize_user_id(Some("player-1@home")), "player1home");
        assert_eq!(sanitize_user_id(None), "default");
        assert_eq!(sanitize_user_id(Some("---")), "default");
    }

    #[test]
    fn storage_key_layout() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let key = storage_key(Outcome::Lose, Some("u-1"), now);
        assert_eq!(key, format!("2024-3-7/u1/lose{}.json", now.timestamp_millis()));
    }

    #[test]
    fn key_date_parses_padded_and_unpadded() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7);
        assert_eq!(key_date("2024-3-7/u1/win1.json"), expected);
        assert_eq!(key_date("2024-03-07/u1/win1.json"), expected);
        assert_eq!(key_date("win1700000000000.json"), None);
        assert_eq!(key_date("2024-13-1/u/win1.json"), None);
    }

    #[test]
    fn record_serializes_flat() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["userId"], "player-1");
        assert_eq!(json["reelsDisplay"], "🍒🍒🍒");
        assert_eq!(json["outcome"], "win");
        assert_eq!(json["prompt"], "Be funny.");
        assert_eq!(json["response"], "🍒🍒🍒<pause:200ms>Nice!");
        let back: ExchangeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample_record());
    }

    #[test]
    fn legacy_record_outcome_from_status() {
        let json = r#"{"userId":"x","timestamp":5,"games":2,"wins":0,"losses":1,
            "status":"lose","speech":"Oops.","prompt":"p","response":"r"}"#;
        let record: ExchangeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.outcome(), Some(Outcome::Lose));
        assert_eq!(record.session.games_played, 2);
    }

    #[tokio::test]
    async fn record_exchange_writes_to_memory_store() {
        let store = MemoryStore::new();
        let key = record_exchange(&store, &sample_record()).await.unwrap();
        assert!(key.contains("/player1/win"));
        assert!(key.ends_with(".json"));

        let body = store.get(&key).await.unwrap();
        let back: ExchangeRecord = serde_json::from_str(&body).unwrap();
        assert_eq!(back.response, "🍒🍒🍒<pause:200ms>Nice!");
    }

    struct FailingStore;

    impl ExchangeStore for FailingStore {
        fn put<'a>(&'a self, _key: &'a str, _body: String) -> StoreFuture<'a, ()> {
            Box::pin(async { Err("disk full".to_string()) })
        }
        fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, String> {
            Box::pin(async { Err("unavailable".to_string()) })
        }
        fn list(&self) -> StoreFuture<'_, Vec<String>> {
            Box::pin(async { Err("unavailable".to_string()) })
        }
    }

    #[tokio::test]
    async fn record_exchange_swallows_store_errors() {
        assert!(record_exchange(&FailingStore, &sample_record()).await.is_none());
    }

    #[tokio::test]
    async fn fs_store_put_get_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();

        store.put("2024-3-7/u1/win1.json", "{}".into()).await.unwrap();
        store.put("2024-3-8/u2/lose2.json", "[]".into()).await.unwrap();
        store.put("win0.json", "legacy".into()).await.unwrap();

        assert_eq!(store.get("2024-3-8/u2/lose2.json").await.unwrap(), "[]");
        assert_eq!(
            store.list().await.unwrap(),
            vec!["2024-3-7/u1/win1.json", "2024-3-8/u2/lose2.json", "win0.json"]
        );
    }

    #[tokio::test]
    async fn fs_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        store.put("a/b.json", "x".into()).await.unwrap();
        assert!(!dir.path().join("a").join(".b.json.tmp").exists());
    }

    #[tokio::test]
    async fn fs_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        assert!(store.put("../outside.json", "x".into()).await.is_err());
        assert!(store.get("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn memory_store_missing_key_errors() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(store.get("nope").await.is_err());
    }
}
