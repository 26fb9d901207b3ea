// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence seam used by the engine.

use crate::snapshot::SnapshotError;
use crate::wal::WalError;
use async_trait::async_trait;
use portico_core::{Agent, AgentId, RuntimeSession, SessionId, Signal, SignalId, StepId};
use thiserror::Error;

/// Persistence failures. Never fatal to the scheduler: callers log them and
/// carry on with their in-memory view.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    async fn get_agent(&self, id: &AgentId) -> Result<Option<Agent>, StoreError>;
    async fn list_agents(&self) -> Result<Vec<Agent>, StoreError>;
    async fn save_agent(&self, agent: &Agent) -> Result<(), StoreError>;
    /// Returns whether the agent existed.
    async fn delete_agent(&self, id: &AgentId) -> Result<bool, StoreError>;
    /// Bump a step's run counter, and its success counter when `succeeded`.
    async fn record_step_run(
        &self,
        agent_id: &AgentId,
        step_id: &StepId,
        succeeded: bool,
    ) -> Result<(), StoreError>;

    async fn save_signal(&self, signal: &Signal) -> Result<(), StoreError>;
    async fn get_signal(&self, id: SignalId) -> Result<Option<Signal>, StoreError>;
    /// Highest signal id ever saved, so ids stay monotonic across restarts.
    async fn last_signal_id(&self) -> Result<u64, StoreError>;
    /// Signals not yet complete or errored, oldest first.
    async fn unfinished_signals(&self) -> Result<Vec<Signal>, StoreError>;
    /// Up to `limit` of the newest finished signals with a correlation id,
    /// oldest first.
    async fn finished_correlated_signals(&self, limit: usize) -> Result<Vec<Signal>, StoreError>;

    async fn save_session(&self, session: &RuntimeSession) -> Result<(), StoreError>;
    async fn get_session(&self, id: &SessionId) -> Result<Option<RuntimeSession>, StoreError>;
}
