//! Error/event log persistence.

use super::{read_json, write_json_atomic};
use crate::types::{ErrorEntry, ErrorKind};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

const ERROR_LOG_FILE: &str = "error-log.json";

/// Append-only, newest-first list of operational events and failures.
pub struct ErrorLog {
    path: PathBuf,
    lock: RwLock<()>,
}

impl ErrorLog {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(ERROR_LOG_FILE),
            lock: RwLock::new(()),
        }
    }

    fn read_unlocked(&self) -> Vec<ErrorEntry> {
        match read_json(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                if self.path.exists() {
                    warn!("Error reading error log: {:#}", e);
                }
                Vec::new()
            }
        }
    }

    /// Full log, newest first.
    pub fn load(&self) -> Vec<ErrorEntry> {
        let _guard = self.lock.read().unwrap();
        self.read_unlocked()
    }

    /// Prepend an entry to the log.
    pub fn append(&self, entry: ErrorEntry) -> Result<()> {
        let _guard = self.lock.write().unwrap();

        let mut entries = self.read_unlocked();
        entries.insert(0, entry);
        write_json_atomic(&self.path, &entries)
    }

    /// Build and append an entry in one step.
    pub fn track(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        chain: Option<String>,
    ) -> Result<()> {
        self.append(ErrorEntry::new(kind, message, chain))
    }

    /// Destructive clear-all.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.write().unwrap();
        write_json_atomic(&self.path, &Vec::<ErrorEntry>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_prepends_stamped_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path());

        log.track(ErrorKind::OrderConflict, "first", Some("Polygon".into()))
            .unwrap();
        log.track(ErrorKind::Buy, "second", None).unwrap();

        let entries = log.load();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, ErrorKind::Buy);
        assert_eq!(entries[1].kind, ErrorKind::OrderConflict);
        assert_eq!(entries[1].chain.as_deref(), Some("Polygon"));
        assert_ne!(entries[0].key, entries[1].key);
    }

    #[test]
    fn clear_empties_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path());

        log.track(ErrorKind::Sell, "boom", None).unwrap();
        assert_eq!(log.load().len(), 1);

        log.clear().unwrap();
        assert!(log.load().is_empty());
    }

    #[test]
    fn missing_document_loads_as_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path());
        assert!(log.load().is_empty());
    }
}
