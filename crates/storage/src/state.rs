// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state built from store events

use crate::event::StoreEvent;
use portico_core::{Agent, RuntimeSession, Signal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub agents: HashMap<String, Agent>,
    /// Keyed by signal id so iteration follows submission order.
    pub signals: BTreeMap<u64, Signal>,
    pub sessions: HashMap<String, RuntimeSession>,
}

impl MaterializedState {
    pub fn apply(&mut self, event: &StoreEvent) {
        match event {
            StoreEvent::AgentSaved { agent } => {
                self.agents.insert(agent.id.to_string(), agent.clone());
            }
            StoreEvent::AgentDeleted { id } => {
                self.agents.remove(id.as_str());
            }
            StoreEvent::StepRan { agent_id, step_id, succeeded } => {
                let step = self
                    .agents
                    .get_mut(agent_id.as_str())
                    .and_then(|a| a.steps.iter_mut().find(|s| &s.id == step_id));
                if let Some(step) = step {
                    step.record_run(*succeeded);
                }
            }
            StoreEvent::SignalSaved { signal } => {
                // Terminal signals are never overwritten by a stale copy.
                let stale = self
                    .signals
                    .get(&signal.id.get())
                    .is_some_and(|s| s.is_terminal() && s.status != signal.status);
                if !stale {
                    self.signals.insert(signal.id.get(), signal.clone());
                }
            }
            StoreEvent::SessionSaved { session } => {
                let stale = self
                    .sessions
                    .get(session.id.as_str())
                    .is_some_and(|s| s.is_terminal() && !session.is_terminal());
                if !stale {
                    self.sessions.insert(session.id.to_string(), session.clone());
                }
            }
        }
    }

    pub fn last_signal_id(&self) -> u64 {
        self.signals.keys().next_back().copied().unwrap_or(0)
    }

    /// The newest `limit` finished signals carrying a correlation id,
    /// oldest first.
    pub fn finished_correlated(&self, limit: usize) -> Vec<Signal> {
        let mut recent: Vec<Signal> = self
            .signals
            .values()
            .rev()
            .filter(|s| s.is_terminal() && s.correlation_id.is_some())
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
