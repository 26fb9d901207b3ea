// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable store: every write is journaled before it becomes visible.

use crate::event::StoreEvent;
use crate::snapshot::{load_snapshot, save_snapshot, snapshot_path};
use crate::state::MaterializedState;
use crate::store::{Store, StoreError};
use crate::wal::Wal;
use async_trait::async_trait;
use parking_lot::Mutex;
use portico_core::{Agent, AgentId, RuntimeSession, SessionId, Signal, SignalId, StepId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Journal entries written between automatic snapshots.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 1000;

struct JournalInner {
    wal: Wal,
    state: MaterializedState,
    snapshot_path: PathBuf,
    /// Sequence covered by the snapshot on disk (0 when there is none).
    snapshot_seq: u64,
    checkpoint_interval: u64,
}

impl JournalInner {
    /// Snapshot the state and drop the journal entries it covers. A crash
    /// between the two steps leaves covered entries, which replay skips.
    fn checkpoint(&mut self) -> Result<u64, StoreError> {
        let seq = self.wal.write_seq();
        if seq == self.snapshot_seq {
            return Ok(seq);
        }
        self.wal.flush()?;
        let size_bytes = save_snapshot(&self.snapshot_path, seq, &self.state)?;
        self.snapshot_seq = seq;
        self.wal.truncate_before(seq + 1)?;
        tracing::info!(seq, size_bytes, "journal checkpointed");
        Ok(seq)
    }
}

#[derive(Clone)]
pub struct JournalStore {
    inner: Arc<Mutex<JournalInner>>,
}

impl JournalStore {
    /// Open the journal at `path`: load its snapshot, then replay the
    /// entries written after it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let snapshot_path = snapshot_path(path);
        let (mut state, snapshot_seq) = match load_snapshot(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (MaterializedState::default(), 0),
        };
        let wal = Wal::open(path, snapshot_seq)?;
        let entries = wal.entries_after(snapshot_seq)?;
        for entry in &entries {
            state.apply(&entry.event);
        }
        tracing::info!(
            path = %path.display(),
            snapshot_seq,
            entries = entries.len(),
            agents = state.agents.len(),
            signals = state.signals.len(),
            "journal replayed"
        );
        let inner = JournalInner {
            wal,
            state,
            snapshot_path,
            snapshot_seq,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        };
        Ok(Self { inner: Arc::new(Mutex::new(inner)) })
    }

    /// Snapshot automatically once this many entries follow the last one.
    pub fn with_checkpoint_interval(self, entries: u64) -> Self {
        self.inner.lock().checkpoint_interval = entries.max(1);
        self
    }

    /// Snapshot now and compact the journal. Returns the covered sequence.
    pub fn checkpoint(&self) -> Result<u64, StoreError> {
        self.inner.lock().checkpoint()
    }

    fn write(&self, event: StoreEvent) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.wal.append(&event)?;
        inner.wal.flush()?;
        inner.state.apply(&event);
        if inner.wal.write_seq() - inner.snapshot_seq >= inner.checkpoint_interval {
            // Retried on the next write.
            if let Err(e) = inner.checkpoint() {
                tracing::warn!(error = %e, "journal checkpoint failed");
            }
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        f(&self.inner.lock().state)
    }
}

#[async_trait]
impl Store for JournalStore {
    async fn get_agent(&self, id: &AgentId) -> Result<Option<Agent>, StoreError> {
        Ok(self.read(|s| s.agents.get(id.as_str()).cloned()))
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, StoreError> {
        Ok(self.read(|s| s.agents.values().cloned().collect()))
    }

    async fn save_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        self.write(StoreEvent::AgentSaved { agent: agent.clone() })
    }

    async fn delete_agent(&self, id: &AgentId) -> Result<bool, StoreError> {
        let existed = self.read(|s| s.agents.contains_key(id.as_str()));
        if existed {
            self.write(StoreEvent::AgentDeleted { id: id.clone() })?;
        }
        Ok(existed)
    }

    async fn record_step_run(
        &self,
        agent_id: &AgentId,
        step_id: &StepId,
        succeeded: bool,
    ) -> Result<(), StoreError> {
        self.write(StoreEvent::StepRan {
            agent_id: agent_id.clone(),
            step_id: step_id.clone(),
            succeeded,
        })
    }

    async fn save_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        self.write(StoreEvent::SignalSaved { signal: signal.clone() })
    }

    async fn get_signal(&self, id: SignalId) -> Result<Option<Signal>, StoreError> {
        Ok(self.read(|s| s.signals.get(&id.get()).cloned()))
    }

    async fn last_signal_id(&self) -> Result<u64, StoreError> {
        Ok(self.read(MaterializedState::last_signal_id))
    }

    async fn unfinished_signals(&self) -> Result<Vec<Signal>, StoreError> {
        Ok(self.read(|s| s.signals.values().filter(|s| !s.is_terminal()).cloned().collect()))
    }

    async fn finished_correlated_signals(&self, limit: usize) -> Result<Vec<Signal>, StoreError> {
        Ok(self.read(|s| s.finished_correlated(limit)))
    }

    async fn save_session(&self, session: &RuntimeSession) -> Result<(), StoreError> {
        self.write(StoreEvent::SessionSaved { session: session.clone() })
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<RuntimeSession>, StoreError> {
        Ok(self.read(|s| s.sessions.get(id.as_str()).cloned()))
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
