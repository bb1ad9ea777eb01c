//! Trade history persistence.
//!
//! Completed trades are kept newest-first; a record never changes once
//! appended.

use super::{read_json, write_json_atomic};
use crate::types::Trade;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

const TRADES_FILE: &str = "trades.json";

/// Append-only, newest-first list of completed trades.
pub struct TradeHistory {
    path: PathBuf,
    lock: RwLock<()>,
}

impl TradeHistory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(TRADES_FILE),
            lock: RwLock::new(()),
        }
    }

    fn read_unlocked(&self) -> Vec<Trade> {
        match read_json(&self.path) {
            Ok(trades) => trades,
            Err(e) => {
                if self.path.exists() {
                    warn!("Error reading trade history: {:#}", e);
                }
                Vec::new()
            }
        }
    }

    /// Full history, newest first.
    pub fn load(&self) -> Vec<Trade> {
        let _guard = self.lock.read().unwrap();
        self.read_unlocked()
    }

    /// Look up a trade by key.
    pub fn find(&self, key: &str) -> Option<Trade> {
        let _guard = self.lock.read().unwrap();
        self.read_unlocked().into_iter().find(|t| t.key == key)
    }

    /// Prepend a completed trade to the history.
    pub fn append(&self, trade: Trade) -> Result<()> {
        let _guard = self.lock.write().unwrap();

        let mut trades = self.read_unlocked();
        trades.insert(0, trade);
        write_json_atomic(&self.path, &trades)
    }
}
