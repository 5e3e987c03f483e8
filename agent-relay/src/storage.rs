//! Key/value side-channel for transient coordinator state.
//!
//! The coordinator records the most recent explain request and its outcome
//! here. Nothing in the relay reads it back; it exists so a host can recover
//! or inspect the last explanation after an overlay was dismissed.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key holding the text most recently sent for explanation.
pub const LAST_TEXT_KEY: &str = "last_text";

/// Key holding the latest explanation, or `"Loading..."` while in flight.
pub const LAST_EXPLANATION_KEY: &str = "last_explanation";

/// Placeholder written while an explanation is pending.
pub const LOADING_PLACEHOLDER: &str = "Loading...";

/// Error type for state store writes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A string key/value store.
pub trait StateStore: Send + Sync {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

/// Store persisted as a single JSON object, rewritten on every `set`.
///
/// A `set` becomes visible to `get` only after the file write succeeds, so
/// memory never runs ahead of disk. Writers are serialized by their own lock;
/// readers only wait on the in-memory map.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    writer: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file is
    /// readable. An unreadable or corrupt file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Discarding corrupt state file {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _writer = self.writer.lock();
        let json = {
            let mut next = self.entries.lock().clone();
            next.insert(key.to_string(), value.to_string());
            serde_json::to_string_pretty(&next)?
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.get(LAST_TEXT_KEY).is_none());
        store.set(LAST_TEXT_KEY, "hello").unwrap();
        store.set(LAST_TEXT_KEY, "again").unwrap();
        assert_eq!(store.get(LAST_TEXT_KEY).as_deref(), Some("again"));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = JsonFileStore::open(&path);
        store.set(LAST_TEXT_KEY, "Paris").unwrap();
        store.set(LAST_EXPLANATION_KEY, LOADING_PLACEHOLDER).unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(LAST_TEXT_KEY).as_deref(), Some("Paris"));
        assert_eq!(
            reopened.get(LAST_EXPLANATION_KEY).as_deref(),
            Some(LOADING_PLACEHOLDER)
        );
    }

    #[test]
    fn test_file_store_failed_write_is_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let store = JsonFileStore::open(blocker.join("state.json"));
        assert!(matches!(
            store.set(LAST_TEXT_KEY, "lost"),
            Err(StoreError::Io(_))
        ));
        assert!(store.get(LAST_TEXT_KEY).is_none());
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert!(store.get(LAST_TEXT_KEY).is_none());
        store.set(LAST_TEXT_KEY, "ok").unwrap();
        assert_eq!(JsonFileStore::open(&path).get(LAST_TEXT_KEY).as_deref(), Some("ok"));
    }
}
