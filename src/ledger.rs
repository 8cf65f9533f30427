//! Durable record of published periods.
//!
//! Publishing is irreversible: a post cannot be taken back. Before any
//! network call the pipeline asks the ledger whether the period was already
//! published, and only after the platform confirms a post does it record one.
//!
//! # Design
//!
//! The ledger is an append-only sequence of [`LedgerEntry`] with at most one
//! entry per period. It is split in two layers:
//!
//! - [`LedgerStore`]: where the sequence lives. `load` reads the whole
//!   sequence; `save` replaces it. [`JsonFileStore`] is the production store;
//!   a transactional store can be dropped in without touching the pipeline.
//! - [`Ledger`]: the in-memory view the pipeline talks to (`has`, `append`).
//!   `append` persists immediately and rolls back its in-memory push if the
//!   store fails, so memory and disk never disagree.
//!
//! ## Storage
//!
//! The file is a pretty-printed JSON array, compatible with existing
//! `posted.json` files:
//!
//! ```json
//! [
//!   {
//!     "week": 3,
//!     "time": "2024-01-15T01:00:00.123Z",
//!     "postId": "urn:li:share:7150000000000000000"
//!   }
//! ]
//! ```
//!
//! Timestamps are written as RFC 3339 in UTC with millisecond precision, so
//! `save(load())` on an untouched file reproduces it byte for byte.
//!
//! Saves are atomic: the new content goes to a sibling `*.tmp` file which is
//! then renamed over the ledger. A crash or failed write leaves the previous
//! file untouched.
//!
//! ## Concurrency
//!
//! One writer is assumed. Running two schedulers against the same file needs
//! a file lock or a transactional store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error on ledger {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("ledger {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("week {0} is already recorded in the ledger")]
    Duplicate(u32),
}

/// One completed publication. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "week")]
    pub period: u32,
    #[serde(rename = "time", with = "rfc3339_millis")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "postId")]
    pub remote_post_id: Option<String>,
}

impl LedgerEntry {
    pub fn new(period: u32, published_at: DateTime<Utc>, remote_post_id: Option<String>) -> Self {
        Self {
            period,
            published_at,
            remote_post_id,
        }
    }
}

mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Where the ledger sequence is persisted.
pub trait LedgerStore {
    /// Read the full sequence. No prior state yields an empty sequence.
    fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Replace the full sequence. Either the new sequence is stored or the
    /// previous one remains readable.
    fn save(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for &S {
    fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        (**self).load()
    }

    fn save(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        (**self).save(entries)
    }
}

/// Ledger persisted as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        let entries: Vec<LedgerEntry> =
            serde_json::from_str(&content).map_err(|e| LedgerError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        check_invariants(&entries).map_err(|reason| LedgerError::Corrupt {
            path: self.path.clone(),
            reason,
        })?;
        Ok(entries)
    }

    fn save(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| self.io_error(io::Error::other(e)))?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let temp = self.temp_path();
        if let Err(e) = fs::write(&temp, json) {
            let _ = fs::remove_file(&temp);
            return Err(self.io_error(e));
        }
        fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))
    }
}

/// Every period is ≥ 1 and appears at most once.
fn check_invariants(entries: &[LedgerEntry]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.period == 0 {
            return Err("entry with week 0".to_string());
        }
        if !seen.insert(entry.period) {
            return Err(format!("week {} recorded more than once", entry.period));
        }
    }
    Ok(())
}

/// In-memory view over a [`LedgerStore`].
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    entries: Vec<LedgerEntry>,
}

impl<S: LedgerStore> Ledger<S> {
    /// Load the current sequence from `store`.
    pub fn open(store: S) -> Result<Self, LedgerError> {
        let entries = store.load()?;
        Ok(Self { store, entries })
    }

    /// True iff `period` has been published.
    pub fn has(&self, period: u32) -> bool {
        self.get(period).is_some()
    }

    pub fn get(&self, period: u32) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.period == period)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Record `entry` and persist the full sequence.
    ///
    /// On a store failure the entry is dropped again, leaving both memory and
    /// the store at their previous state.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if self.has(entry.period) {
            return Err(LedgerError::Duplicate(entry.period));
        }
        self.entries.push(entry);
        if let Err(e) = self.store.save(&self.entries) {
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Store kept in memory, with switchable save failure.
    #[derive(Default)]
    pub struct MemoryStore {
        pub entries: Mutex<Vec<LedgerEntry>>,
        pub fail_saves: AtomicBool,
        pub saves: AtomicUsize,
    }

    impl MemoryStore {
        pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
            Self {
                entries: Mutex::new(entries),
                ..Self::default()
            }
        }

        pub fn snapshot(&self) -> Vec<LedgerEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    impl LedgerStore for MemoryStore {
        fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(self.snapshot())
        }

        fn save(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(LedgerError::Io {
                    path: PathBuf::from("<memory>"),
                    source: io::Error::other("simulated write failure"),
                });
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.entries.lock().unwrap() = entries.to_vec();
            Ok(())
        }
    }

    pub fn entry(period: u32, post_id: Option<&str>) -> LedgerEntry {
        LedgerEntry::new(
            period,
            Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap(),
            post_id.map(String::from),
        )
    }

    const EXISTING_LEDGER: &str = r#"[
  {
    "week": 1,
    "time": "2024-01-01T01:00:00.123Z",
    "postId": "urn:li:share:1"
  },
  {
    "week": 2,
    "time": "2024-01-08T01:00:02.000Z",
    "postId": null
  }
]"#;

    // =========================================================================
    // JsonFileStore
    // =========================================================================

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("posted.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn load_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        fs::write(&path, EXISTING_LEDGER).unwrap();

        let entries = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].period, 1);
        assert_eq!(entries[0].remote_post_id.as_deref(), Some("urn:li:share:1"));
        assert_eq!(entries[1].remote_post_id, None);
    }

    #[test]
    fn save_of_untouched_load_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        fs::write(&path, EXISTING_LEDGER).unwrap();

        let store = JsonFileStore::new(&path);
        let entries = store.load().unwrap();
        store.save(&entries).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), EXISTING_LEDGER);
    }

    #[test]
    fn load_corrupt_json_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        fs::write(&path, "[{\"week\": 1,").unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { .. }));
    }

    #[test]
    fn load_rejects_week_zero() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        fs::write(
            &path,
            r#"[{"week": 0, "time": "2024-01-01T01:00:00.000Z", "postId": null}]"#,
        )
        .unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("week 0"));
    }

    #[test]
    fn load_rejects_duplicate_weeks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        fs::write(
            &path,
            r#"[
  {"week": 4, "time": "2024-01-01T01:00:00.000Z", "postId": null},
  {"week": 4, "time": "2024-01-08T01:00:00.000Z", "postId": null}
]"#,
        )
        .unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/ledger/posted.json");
        let store = JsonFileStore::new(&path);
        store.save(&[entry(3, Some("urn:li:share:3"))]).unwrap();

        assert_eq!(store.load().unwrap(), vec![entry(3, Some("urn:li:share:3"))]);
        assert!(!tmp.path().join("state/ledger/posted.json.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_previous_ledger_intact() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        fs::write(&path, EXISTING_LEDGER).unwrap();
        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(tmp.path().join("posted.json.tmp")).unwrap();

        let store = JsonFileStore::new(&path);
        let mut ledger = Ledger::open(&store).unwrap();
        let err = ledger.append(entry(3, None)).unwrap_err();

        assert!(matches!(err, LedgerError::Io { .. }));
        assert!(!ledger.has(3));
        assert_eq!(fs::read_to_string(&path).unwrap(), EXISTING_LEDGER);
        assert_eq!(store.load().unwrap().len(), 2);
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    #[test]
    fn has_reports_recorded_periods() {
        let ledger = Ledger::open(MemoryStore::with_entries(vec![entry(5, None)])).unwrap();
        assert!(ledger.has(5));
        assert!(!ledger.has(6));
    }

    #[test]
    fn append_persists_full_sequence() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("posted.json"));
        let mut ledger = Ledger::open(&store).unwrap();

        ledger.append(entry(1, Some("a"))).unwrap();
        ledger.append(entry(2, None)).unwrap();

        let reloaded = Ledger::open(&store).unwrap();
        assert_eq!(reloaded.entries(), &[entry(1, Some("a")), entry(2, None)]);
    }

    #[test]
    fn append_rejects_duplicate_period() {
        let store = MemoryStore::with_entries(vec![entry(7, None)]);
        let mut ledger = Ledger::open(&store).unwrap();

        let err = ledger.append(entry(7, Some("again"))).unwrap_err();
        assert!(matches!(err, LedgerError::Duplicate(7)));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn append_rolls_back_on_store_failure() {
        let store = MemoryStore::with_entries(vec![entry(1, None)]);
        store.fail_saves.store(true, Ordering::SeqCst);
        let mut ledger = Ledger::open(&store).unwrap();

        assert!(ledger.append(entry(2, None)).is_err());
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(store.snapshot(), vec![entry(1, None)]);
    }

    #[test]
    fn timestamps_serialize_with_millis_and_z() {
        let e = LedgerEntry::new(
            9,
            Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap(),
            Some("urn:li:share:9".into()),
        );
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(
            json,
            r#"{"week":9,"time":"2024-03-04T01:00:00.000Z","postId":"urn:li:share:9"}"#
        );
    }
}
