// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent definition commands: create, delete, start, stop.

use crate::engine::Shared;
use portico_adapters::{ModelAdapter, SandboxAdapter};
use portico_core::{Agent, AgentError, AgentId, Clock};
use portico_storage::Store;
use serde::{Deserialize, Serialize};

/// Detail recorded on queued signals whose agent was deleted.
pub const AGENT_DELETED: &str = "agent deleted";

/// Outcome of an agent command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

impl<S, X, M, C> Shared<S, X, M, C>
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    /// Store a definition (replacing any previous one with the same id)
    /// and make sure its queue exists.
    pub(crate) async fn create_agent(&self, mut agent: Agent) -> CommandResponse {
        if let Err(e) = agent.validate() {
            tracing::warn!(agent = %agent.id, error = %e, "agent definition rejected");
            return CommandResponse::failed(e.to_string());
        }

        let existing = match self.store.get_agent(&agent.id).await {
            Ok(existing) => existing,
            Err(e) => return CommandResponse::failed(format!("agent {} not saved: {e}", agent.id)),
        };
        let now = self.clock.epoch_ms();
        agent.created_at_ms = existing.as_ref().map_or(now, |a| a.created_at_ms);
        agent.updated_at_ms = now;

        if let Err(e) = self.store.save_agent(&agent).await {
            tracing::warn!(agent = %agent.id, error = %e, "agent not saved");
            return CommandResponse::failed(format!("agent {} not saved: {e}", agent.id));
        }
        self.queues.entry(&agent.id);

        let verb = if existing.is_some() { "updated" } else { "created" };
        tracing::info!(agent = %agent.id, steps = agent.steps.len(), state = %agent.state, "agent {verb}");
        CommandResponse::ok(format!("agent {} {verb} with {} step(s)", agent.id, agent.steps.len()))
    }

    /// Remove a definition. Runs still queued for it end as `error`; a run
    /// already in flight finishes first.
    pub(crate) async fn delete_agent(&self, agent_id: &AgentId) -> CommandResponse {
        match self.store.delete_agent(agent_id).await {
            Ok(true) => {}
            Ok(false) => return CommandResponse::failed(format!("agent {agent_id} not found")),
            Err(e) => {
                return CommandResponse::failed(format!("agent {agent_id} not deleted: {e}"))
            }
        }
        let failed = self.drop_queue(agent_id, AGENT_DELETED).await;
        tracing::info!(agent = %agent_id, failed, "agent deleted");
        if failed > 0 {
            CommandResponse::ok(format!("agent {agent_id} deleted, {failed} queued signal(s) failed"))
        } else {
            CommandResponse::ok(format!("agent {agent_id} deleted"))
        }
    }

    pub(crate) async fn start_agent(&self, agent_id: &AgentId) -> CommandResponse {
        self.transition(agent_id, "started", Agent::start).await
    }

    pub(crate) async fn stop_agent(&self, agent_id: &AgentId) -> CommandResponse {
        self.transition(agent_id, "stopped", Agent::stop).await
    }

    async fn transition(
        &self,
        agent_id: &AgentId,
        verb: &str,
        apply: fn(&mut Agent) -> Result<(), AgentError>,
    ) -> CommandResponse {
        let mut agent = match self.store.get_agent(agent_id).await {
            Ok(Some(agent)) => agent,
            Ok(None) => return CommandResponse::failed(format!("agent {agent_id} not found")),
            Err(e) => return CommandResponse::failed(format!("agent {agent_id} not loaded: {e}")),
        };
        if let Err(e) = apply(&mut agent) {
            return CommandResponse::failed(e.to_string());
        }
        agent.updated_at_ms = self.clock.epoch_ms();
        if let Err(e) = self.store.save_agent(&agent).await {
            return CommandResponse::failed(format!("agent {agent_id} not saved: {e}"));
        }
        tracing::info!(agent = %agent_id, state = %agent.state, "agent {verb}");
        CommandResponse::ok(format!("agent {agent_id} {verb}"))
    }
}
