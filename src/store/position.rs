//! Position ledger persistence.

use super::{read_json, write_json_atomic};
use crate::types::Position;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

const POSITION_FILE: &str = "position.json";

/// Durable record of the single trading position.
pub struct PositionStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl PositionStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(POSITION_FILE),
            lock: RwLock::new(()),
        }
    }

    /// Current position snapshot. A missing or unreadable document is the
    /// closed default, matching a bot that has never traded.
    pub fn load(&self) -> Position {
        let _guard = self.lock.read().unwrap();

        match read_json(&self.path) {
            Ok(position) => position,
            Err(e) => {
                if self.path.exists() {
                    warn!("Error reading position document: {:#}", e);
                }
                Position::default()
            }
        }
    }

    /// Replace the position snapshot.
    pub fn save(&self, position: &Position) -> Result<()> {
        let _guard = self.lock.write().unwrap();
        write_json_atomic(&self.path, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_document_loads_closed_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path());

        let position = store.load();
        assert!(!position.position_open);
        assert_eq!(position.token_balance, dec!(0));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path());

        let mut position = Position::default();
        position.position_open = true;
        position.stablecoin_balance = dec!(750);
        position.token_balance = dec!(0.135);
        position.open_trade_key = Some("abc".to_string());
        store.save(&position).unwrap();

        let back = store.load();
        assert!(back.position_open);
        assert_eq!(back.stablecoin_balance, dec!(750));
        assert_eq!(back.open_trade_key.as_deref(), Some("abc"));
    }

    #[test]
    fn repeated_loads_without_writes_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path());

        let mut position = Position::default();
        position.stablecoin_balance = dec!(1000);
        store.save(&position).unwrap();

        let a = store.load();
        let b = store.load();
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    #[test]
    fn corrupt_document_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(POSITION_FILE), "{not json").unwrap();

        let store = PositionStore::new(dir.path());
        assert!(!store.load().position_open);
    }
}
