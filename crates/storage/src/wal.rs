// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL journal of store events.
//!
//! One `{"seq": n, "event": {..}}` document per line. On open, the valid
//! prefix is kept; anything after the first unreadable line is moved aside
//! to a `.bak` file so the journal can keep growing.

use crate::event::StoreEvent;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_BACKUPS: usize = 3;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal encode error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: StoreEvent,
}

pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
}

impl Wal {
    /// Open (or create) the journal at `path`. Numbering continues after
    /// `min_seq` even when the file holds nothing newer (after truncation).
    pub fn open(path: &Path, min_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let (entries, corrupt) = if path.exists() { read_valid(path)? } else { (Vec::new(), false) };

        if corrupt {
            tracing::warn!(
                path = %path.display(),
                valid_entries = entries.len(),
                "journal has unreadable tail, rotating to .bak"
            );
            rotate_backups(path)?;
            std::fs::rename(path, path.with_extension("bak"))?;
            let mut clean = BufWriter::new(File::create(path)?);
            for entry in &entries {
                serde_json::to_writer(&mut clean, entry)?;
                clean.write_all(b"\n")?;
            }
            clean.flush()?;
        }

        let write_seq = entries.last().map_or(0, |e| e.seq).max(min_seq);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { path: path.to_path_buf(), writer: BufWriter::new(file), write_seq })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number of the last appended entry (0 when empty).
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Buffer one event. Not durable until [`Wal::flush`].
    pub fn append(&mut self, event: &StoreEvent) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let line = serde_json::to_string(&WalEntryRef { seq, event })?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.write_seq = seq;
        Ok(seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Entries with `seq > after`, stopping at the first unreadable line.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let (entries, _) = read_valid(&self.path)?;
        Ok(entries.into_iter().filter(|e| e.seq > after).collect())
    }

    /// Drop every entry with `seq < before`. The rewrite goes through a
    /// temporary file so a crash leaves either the old or the new journal.
    pub fn truncate_before(&mut self, before: u64) -> Result<(), WalError> {
        self.flush()?;
        let (entries, _) = read_valid(&self.path)?;
        let tmp = tmp_path(&self.path);
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            for entry in entries.iter().filter(|e| e.seq >= before) {
                serde_json::to_writer(&mut out, entry)?;
                out.write_all(b"\n")?;
            }
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}

/// `<path>.tmp`, next to the file it replaces.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[derive(Serialize)]
struct WalEntryRef<'a> {
    seq: u64,
    event: &'a StoreEvent,
}

/// Read the valid prefix of the file. The flag is set when something after
/// that prefix could not be parsed.
fn read_valid(path: &Path) -> Result<(Vec<WalEntry>, bool), WalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.split(b'\n') {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<WalEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(_) => return Ok((entries, true)),
        }
    }
    Ok((entries, false))
}

/// Shift `.bak` → `.bak.2` → `.bak.3`, dropping the oldest.
fn rotate_backups(path: &Path) -> Result<(), WalError> {
    let name = |n: usize| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };
    for n in (1..MAX_BACKUPS).rev() {
        let from = name(n);
        if from.exists() {
            std::fs::rename(&from, name(n + 1))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
