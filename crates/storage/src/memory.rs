// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process store with no durability.

use crate::event::StoreEvent;
use crate::state::MaterializedState;
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use portico_core::{Agent, AgentId, RuntimeSession, SessionId, Signal, SignalId, StepId};
use std::sync::Arc;

#[derive(Default)]
struct MemoryInner {
    state: MaterializedState,
    fail_writes: bool,
    events: Vec<StoreEvent>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, event: StoreEvent) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StoreError::Unavailable(format!("write rejected: {event}")));
        }
        inner.state.apply(&event);
        inner.events.push(event);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        f(&self.inner.lock().state)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryStore {
    /// Make every subsequent write fail with `Unavailable` until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Every successful write, in order.
    pub fn events(&self) -> Vec<StoreEvent> {
        self.inner.lock().events.clone()
    }

    pub fn sessions(&self) -> Vec<RuntimeSession> {
        let mut sessions: Vec<_> = self.read(|s| s.sessions.values().cloned().collect());
        sessions.sort_by_key(|s| s.signal_id);
        sessions
    }
}

#[async_trait]
impl Store for MemoryStore {
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
#[path = "memory_tests.rs"]
mod tests;
