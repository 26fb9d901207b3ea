// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for the journal.
//!
//! A snapshot holds the complete materialized state as of a journal
//! sequence number. Recovery loads it and replays only the journal entries
//! after that sequence.

use crate::state::MaterializedState;
use crate::wal::tmp_path;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot decode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    /// Last journal sequence folded into `state`
    pub seq: u64,
    pub state: MaterializedState,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    #[serde(rename = "v")]
    version: u32,
    seq: u64,
    state: &'a MaterializedState,
}

/// `store.jsonl` keeps its snapshot in `store.snapshot`.
pub fn snapshot_path(journal: &Path) -> PathBuf {
    journal.with_extension("snapshot")
}

/// Load the snapshot at `path`, if one was ever written.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version(snapshot.version));
    }
    Ok(Some(snapshot))
}

/// Write `state` as of `seq`, replacing any previous snapshot atomically.
/// Returns the size written in bytes.
pub fn save_snapshot(
    path: &Path,
    seq: u64,
    state: &MaterializedState,
) -> Result<u64, SnapshotError> {
    let tmp = tmp_path(path);
    let size = {
        let mut out = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut out, &SnapshotRef { version: SNAPSHOT_VERSION, seq, state })?;
        out.flush()?;
        let file = out.get_ref();
        file.sync_all()?;
        file.metadata()?.len()
    };
    std::fs::rename(&tmp, path)?;
    Ok(size)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
