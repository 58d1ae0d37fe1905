use crate::error::PersistenceError;
use crate::session::TestResult;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key the history blob is stored under.
pub const HISTORY_KEY: &str = "typing_test_scores_v1";

/// Most results kept, newest first.
pub const MAX_ENTRIES: usize = 10;

/// Minimal persistent key-value store holding whole string blobs
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

impl<B: BlobStore + ?Sized> BlobStore for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        (**self).remove(key)
    }
}

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        // rename replaces the old blob in one step
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.blobs.remove(key);
        Ok(())
    }
}

/// Rolling log of the last `MAX_ENTRIES` results
#[derive(Debug)]
pub struct HistoryStore<S: BlobStore> {
    store: S,
}

impl<S: BlobStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load(&self) -> Result<Vec<TestResult>, PersistenceError> {
        match self.store.get(HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Stored results, newest first. A missing or unreadable blob reads as
    /// empty.
    pub fn read_all(&self) -> Vec<TestResult> {
        self.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not read score history, treating it as empty");
            Vec::new()
        })
    }

    pub fn append(&mut self, result: TestResult) -> Result<(), PersistenceError> {
        let mut list = self.read_all();
        list.insert(0, result);
        list.truncate(MAX_ENTRIES);
        let raw = serde_json::to_string(&list)?;
        self.store.set(HISTORY_KEY, &raw)?;
        debug!(entries = list.len(), "score history saved");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), PersistenceError> {
        self.store.remove(HISTORY_KEY)?;
        debug!("score history cleared");
        Ok(())
    }

    /// Write the history as CSV, returning the number of rows.
    pub fn export_csv<W: Write>(&self, out: W) -> Result<usize, PersistenceError> {
        let list = self.read_all();
        let mut writer = csv::Writer::from_writer(out);
        if list.is_empty() {
            writer.write_record(["date", "wpm", "accuracy", "time", "difficulty"])?;
        }
        for result in &list {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Difficulty;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn result(wpm: u32) -> TestResult {
        TestResult {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, wpm % 60).unwrap(),
            wpm,
            accuracy: 95,
            time_used: 42.5,
            difficulty: Difficulty::Medium,
        }
    }

    #[test]
    fn empty_store_reads_empty() {
        let history = HistoryStore::new(MemoryBlobStore::new());
        assert!(history.read_all().is_empty());
    }

    #[test]
    fn append_prepends_newest_first() {
        let mut history = HistoryStore::new(MemoryBlobStore::new());
        history.append(result(10)).unwrap();
        history.append(result(20)).unwrap();
        let all = history.read_all();
        assert_eq!(all.iter().map(|r| r.wpm).collect::<Vec<_>>(), vec![20, 10]);
    }

    #[test]
    fn append_caps_at_ten_entries() {
        let mut history = HistoryStore::new(MemoryBlobStore::new());
        for wpm in 1..=25 {
            history.append(result(wpm)).unwrap();
            assert!(history.read_all().len() <= MAX_ENTRIES);
        }
        let all = history.read_all();
        assert_eq!(all.len(), MAX_ENTRIES);
        assert_eq!(
            all.iter().map(|r| r.wpm).collect::<Vec<_>>(),
            (16..=25).rev().collect::<Vec<_>>()
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let mut history = HistoryStore::new(MemoryBlobStore::new());
        history.append(result(30)).unwrap();
        history.append(result(30)).unwrap();
        assert_eq!(history.read_all().len(), 2);
    }

    #[test]
    fn corrupt_blob_reads_empty_and_is_replaced_on_append() {
        let mut store = MemoryBlobStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        let mut history = HistoryStore::new(store);
        assert!(history.read_all().is_empty());

        history.append(result(55)).unwrap();
        assert_eq!(history.read_all().len(), 1);
    }

    #[test]
    fn clear_then_read_is_empty() {
        let mut history = HistoryStore::new(MemoryBlobStore::new());
        history.append(result(1)).unwrap();
        history.clear().unwrap();
        assert!(history.read_all().is_empty());
        assert_eq!(history.store().get(HISTORY_KEY).unwrap(), None);
        // clearing twice is fine
        history.clear().unwrap();
    }

    #[test]
    fn reads_blob_written_by_the_browser_version() {
        let raw = r#"[{"date":"2025-01-02T03:04:05.678Z","wpm":48,"accuracy":91,"time":60,"difficulty":"hard"},
                     {"date":"2025-01-01T03:04:05.000Z","wpm":30,"accuracy":100,"time":12.34,"difficulty":"easy"}]"#;
        let mut store = MemoryBlobStore::new();
        store.set(HISTORY_KEY, raw).unwrap();
        let all = HistoryStore::new(store).read_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].difficulty, Difficulty::Hard);
        assert_eq!(all[0].time_used, 60.0);
        assert_eq!(all[1].time_used, 12.34);
    }

    #[test]
    fn file_store_roundtrip_and_remove() {
        let dir = tempdir().unwrap();
        let mut store = FileBlobStore::with_dir(dir.path().join("nested"));
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert!(!store.path_for("k").with_extension("json.tmp").exists());
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.remove("k").unwrap();
    }

    #[test]
    fn file_backed_history_survives_reopen() {
        let dir = tempdir().unwrap();
        let mut history = HistoryStore::new(FileBlobStore::with_dir(dir.path()));
        history.append(result(42)).unwrap();
        drop(history);

        let reopened = HistoryStore::new(FileBlobStore::with_dir(dir.path()));
        assert_eq!(reopened.read_all(), vec![result(42)]);
    }

    #[test]
    fn garbage_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::with_dir(dir.path());
        fs::write(store.path_for(HISTORY_KEY), b"\xff\xfe garbage").unwrap();
        assert!(HistoryStore::new(store).read_all().is_empty());
    }

    #[test]
    fn export_csv_writes_header_and_rows() {
        let mut history = HistoryStore::new(MemoryBlobStore::new());
        history.append(result(12)).unwrap();
        history.append(result(34)).unwrap();

        let mut out = Vec::new();
        let rows = history.export_csv(&mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,wpm,accuracy,time,difficulty");
        assert!(lines[1].contains(",34,95,42.5,medium"));
        assert!(lines[2].contains(",12,95,42.5,medium"));
    }

    #[test]
    fn export_csv_of_empty_history_has_header_only() {
        let history = HistoryStore::new(MemoryBlobStore::new());
        let mut out = Vec::new();
        assert_eq!(history.export_csv(&mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap().trim(),
            "date,wpm,accuracy,time,difficulty"
        );
    }
}
