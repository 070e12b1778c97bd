//! On-disk state owned by the CLI: the budget ledger and progress history

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::budget::TokenBudget;
use crate::error::StateError;
use crate::progress::ProgressSample;

/// Write `data` next to `path` and rename it into place, so readers never
/// see a partial file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StateError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_state<T: DeserializeOwned>(path: &Path) -> Result<T, StateError> {
    if !path.exists() {
        return Err(StateError::Missing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| StateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_state<T: Serialize>(path: &Path, value: &T) -> Result<(), StateError> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())?;
    debug!("Saved {}", path.display());
    Ok(())
}

pub fn load_ledger(path: &Path) -> Result<TokenBudget, StateError> {
    read_state(path)
}

pub fn save_ledger(path: &Path, ledger: &TokenBudget) -> Result<(), StateError> {
    write_state(path, ledger)
}

/// Completion samples recorded over time; an absent file is an empty history
pub fn load_history(path: &Path) -> Result<Vec<ProgressSample>, StateError> {
    match read_state(path) {
        Err(StateError::Missing(_)) => Ok(Vec::new()),
        other => other,
    }
}

/// Append one sample and return the updated history
pub fn record_sample(
    path: &Path,
    completion: u8,
    timestamp: DateTime<Utc>,
) -> Result<Vec<ProgressSample>, StateError> {
    let mut history = load_history(path)?;
    history.push(ProgressSample {
        timestamp,
        completion: completion as f64,
    });
    write_state(path, &history)?;
    Ok(history)
}
