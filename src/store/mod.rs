//! Durable State Stores
//!
//! Position, trade history, and error log are whole-document JSON files
//! under the data directory. Every mutation happens under a scoped write
//! lock (released on all exit paths by guard drop) and lands via
//! write-temp-then-rename, so a crash mid-write never leaves a truncated
//! document behind.
//!
//! Reads of a missing or corrupt document return the empty default: a bot
//! that has never traded has no position, no history, and no errors.

pub mod errors;
pub mod position;
pub mod trades;

pub use errors::ErrorLog;
pub use position::PositionStore;
pub use trades::TradeHistory;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Read and deserialize a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {:?}", path))
}

/// Serialize and write a JSON document atomically.
///
/// The document is written to a sibling temp file and renamed over the
/// target; rename is atomic on POSIX filesystems.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let json = serde_json::to_string_pretty(value).context("Failed to serialize document")?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let tmp = dir.join(format!(".{}.tmp-{}", name, std::process::id()));

    fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(())
}
