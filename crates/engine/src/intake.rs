// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal intake: validation, deduplication, and routing by kind.

use crate::catalog::AGENT_DELETED;
use crate::engine::Shared;
use crate::error::ValidationError;
use crate::handle::{SignalHandle, SignalTracker};
use crate::queue::QueuedRun;
use portico_adapters::{ModelAdapter, SandboxAdapter};
use portico_core::{Agent, AgentId, Clock, CorrelationId, Signal, SignalKind};
use portico_storage::Store;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A signal as submitted by a caller, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub kind: SignalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl SignalRequest {
    pub fn new(kind: SignalKind, payload: Value) -> Self {
        Self { kind, agent_id: None, payload, correlation_id: None }
    }

    pub fn run(agent_id: impl Into<AgentId>, payload: Value) -> Self {
        Self::new(SignalKind::Run, payload).with_agent(agent_id)
    }

    pub fn sync(payload: Value) -> Self {
        Self::new(SignalKind::Sync, payload)
    }

    pub fn fyi(payload: Value) -> Self {
        Self::new(SignalKind::Fyi, payload)
    }

    pub fn with_agent(mut self, agent_id: impl Into<AgentId>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Parse a wire kind name (`command` is accepted for `run`).
    pub fn parse_kind(kind: &str) -> Result<SignalKind, ValidationError> {
        kind.parse().map_err(|_| ValidationError::UnknownKind(kind.to_string()))
    }
}

/// Which agents a `sync` re-resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Specific(Vec<AgentId>),
}

impl SyncScope {
    /// Read the scope from a sync payload.
    ///
    /// `{"scope": "all"}` and `{"scope": "specific", "agents": [..]}` are
    /// explicit. Without a `scope` field, a targeted sync covers its agent
    /// and an untargeted one covers everything.
    pub fn from_request(
        agent_id: Option<&AgentId>,
        payload: &Value,
    ) -> Result<Self, ValidationError> {
        let scope = match payload.get("scope") {
            None | Some(Value::Null) => {
                return Ok(match agent_id {
                    Some(id) => SyncScope::Specific(vec![id.clone()]),
                    None => SyncScope::All,
                });
            }
            Some(Value::String(scope)) => scope.as_str(),
            Some(other) => return Err(ValidationError::InvalidScope(other.to_string())),
        };
        match scope {
            "all" => Ok(SyncScope::All),
            "specific" => {
                let agents = match payload.get("agents") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(id) if !id.is_empty() => Ok(AgentId::from(id.as_str())),
                            other => Err(ValidationError::InvalidScope(format!(
                                "agent ids must be non-empty strings, got {other}"
                            ))),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    None => match agent_id {
                        Some(id) => vec![id.clone()],
                        None => Vec::new(),
                    },
                    Some(other) => {
                        return Err(ValidationError::InvalidScope(format!(
                            "agents must be a list, got {other}"
                        )))
                    }
                };
                if agents.is_empty() {
                    return Err(ValidationError::EmptyScope);
                }
                Ok(SyncScope::Specific(agents))
            }
            other => Err(ValidationError::InvalidScope(other.to_string())),
        }
    }
}

enum Registered {
    New(Signal, SignalTracker),
    Duplicate(SignalHandle),
}

impl<S, X, M, C> Shared<S, X, M, C>
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    pub(crate) async fn submit(
        &self,
        request: SignalRequest,
    ) -> Result<SignalHandle, ValidationError> {
        if self.stopping.is_cancelled() {
            return Err(ValidationError::ShuttingDown);
        }
        if let Some(handle) = self.duplicate_of(request.correlation_id.as_ref()) {
            return Ok(handle);
        }
        match request.kind {
            SignalKind::Run => self.submit_run(request).await,
            SignalKind::Sync => self.submit_sync(request).await,
            SignalKind::Fyi => self.submit_fyi(request).await,
        }
    }

    fn duplicate_of(&self, correlation_id: Option<&CorrelationId>) -> Option<SignalHandle> {
        let correlation_id = correlation_id?;
        let handle = self.dedup.lock().get(correlation_id).map(SignalTracker::handle)?;
        tracing::info!(
            correlation_id = %correlation_id,
            signal = %handle.id(),
            "duplicate submission, returning original signal"
        );
        Some(handle)
    }

    /// Allocate an id and claim the correlation id in one step, so two
    /// concurrent submissions of the same id cannot both create a signal.
    fn register(&self, request: SignalRequest) -> Registered {
        let SignalRequest { kind, agent_id, payload, correlation_id } = request;
        let mut dedup = self.dedup.lock();
        if let Some(tracker) = correlation_id.as_ref().and_then(|id| dedup.get(id)) {
            return Registered::Duplicate(tracker.handle());
        }
        let mut signal = Signal::new(self.ids.next(), kind, agent_id, payload, self.clock.epoch_ms());
        signal.correlation_id = correlation_id.clone();
        let tracker = SignalTracker::new(signal.clone());
        if let Some(id) = correlation_id {
            dedup.insert(id, tracker.clone());
        }
        Registered::New(signal, tracker)
    }

    async fn submit_run(&self, request: SignalRequest) -> Result<SignalHandle, ValidationError> {
        let Some(agent_id) = request.agent_id.clone() else {
            return Err(ValidationError::MissingAgent);
        };
        let rejection = match self.store.get_agent(&agent_id).await {
            Ok(Some(agent)) if agent.accepts_runs() => None,
            Ok(Some(agent)) => Some(format!("agent {agent_id} is {}", agent.state)),
            Ok(None) => Some(format!("agent {agent_id} not found")),
            Err(e) => Some(format!("agent {agent_id} could not be loaded: {e}")),
        };

        let (signal, tracker) = match self.register(request) {
            Registered::New(signal, tracker) => (signal, tracker),
            Registered::Duplicate(handle) => return Ok(handle),
        };
        let handle = tracker.handle();

        if let Some(detail) = rejection {
            tracing::warn!(agent = %agent_id, signal = %signal.id, %detail, "run rejected");
            self.reject(signal, &tracker, detail).await;
            return Ok(handle);
        }

        if let Err(e) = self.store.save_signal(&signal).await {
            tracing::warn!(signal = %signal.id, error = %e, "pending signal not persisted");
        }
        tracing::info!(agent = %agent_id, signal = %signal.id, "run accepted");
        self.queues.enqueue(&agent_id, QueuedRun { signal, tracker });
        Ok(handle)
    }

    async fn submit_fyi(&self, request: SignalRequest) -> Result<SignalHandle, ValidationError> {
        let (mut signal, tracker) = match self.register(request) {
            Registered::New(signal, tracker) => (signal, tracker),
            Registered::Duplicate(handle) => return Ok(handle),
        };
        if let Err(e) = signal.complete(None, self.clock.epoch_ms()) {
            tracing::error!(signal = %signal.id, error = %e, "signal already finalized");
        }
        if let Err(e) = self.store.save_signal(&signal).await {
            tracing::warn!(signal = %signal.id, error = %e, "signal not persisted");
        }
        tracker.publish(&signal);
        tracing::info!(signal = %signal.id, "fyi recorded");
        Ok(tracker.handle())
    }

    async fn submit_sync(&self, request: SignalRequest) -> Result<SignalHandle, ValidationError> {
        let scope = SyncScope::from_request(request.agent_id.as_ref(), &request.payload)?;
        let (mut signal, tracker) = match self.register(request) {
            Registered::New(signal, tracker) => (signal, tracker),
            Registered::Duplicate(handle) => return Ok(handle),
        };
        let handle = tracker.handle();

        if let Err(e) = signal.begin_processing(None, self.clock.epoch_ms()) {
            tracing::error!(signal = %signal.id, error = %e, "sync signal was not pending");
        }
        tracker.publish(&signal);
        if let Err(e) = self.store.save_signal(&signal).await {
            tracing::warn!(signal = %signal.id, error = %e, "signal not persisted");
        }

        let transition = match self.sync(&scope).await {
            Ok(definitions) => signal.complete(Some(definitions), self.clock.epoch_ms()),
            Err(detail) => {
                tracing::warn!(signal = %signal.id, %detail, "sync failed");
                signal.fail(detail, self.clock.epoch_ms())
            }
        };
        if let Err(e) = transition {
            tracing::error!(signal = %signal.id, error = %e, "signal already finalized");
        }
        if let Err(e) = self.store.save_signal(&signal).await {
            tracing::warn!(signal = %signal.id, error = %e, "signal not persisted");
        }
        tracker.publish(&signal);
        Ok(handle)
    }

    /// Re-resolve agent definitions for a scope.
    ///
    /// Dispatch for the scope pauses, in-flight runs are asked to stop at
    /// their next step boundary, and the scope is resumed once they have.
    /// Returns a map of agent id to current definition.
    pub(crate) async fn sync(&self, scope: &SyncScope) -> Result<Value, String> {
        let _serial = self.sync_lock.lock().await;
        let agents: Vec<AgentId> = match scope {
            SyncScope::All => {
                let known = self.list_definitions().await?;
                let mut ids: BTreeSet<AgentId> = known.into_iter().map(|a| a.id).collect();
                ids.extend(self.queues.agents());
                ids.into_iter().collect()
            }
            SyncScope::Specific(ids) => ids.clone(),
        };

        self.queues.pause(&agents);
        let cancelled = self.queues.cancel_in_flight(&agents);
        tracing::info!(agents = agents.len(), cancelled = cancelled.len(), "sync started");
        self.queues.wait_idle(&agents).await;

        // Definitions may have changed while in-flight runs drained.
        let known = match self.list_definitions().await {
            Ok(known) => known,
            Err(detail) => {
                self.queues.resume(&agents);
                return Err(detail);
            }
        };
        let mut definitions = Map::new();
        let mut live = Vec::new();
        for agent_id in &agents {
            match known.iter().find(|a| &a.id == agent_id) {
                Some(agent) => {
                    let value = serde_json::to_value(agent).unwrap_or(Value::Null);
                    definitions.insert(agent_id.to_string(), value);
                    live.push(agent_id.clone());
                }
                None => {
                    self.drop_queue(agent_id, AGENT_DELETED).await;
                }
            }
        }

        self.retry_unpersisted().await;
        self.queues.resume(&live);
        tracing::info!(agents = live.len(), "sync finished");
        Ok(Value::Object(definitions))
    }

    async fn list_definitions(&self) -> Result<Vec<Agent>, String> {
        self.store.list_agents().await.map_err(|e| format!("sync failed: {e}"))
    }

    /// Remove an agent's queue and fail whatever was still waiting in it.
    pub(crate) async fn drop_queue(&self, agent_id: &AgentId, detail: &str) -> usize {
        let drained = self.queues.remove(agent_id);
        let count = drained.len();
        for run in drained {
            self.reject(run.signal, &run.tracker, detail.to_string()).await;
        }
        if count > 0 {
            tracing::info!(agent = %agent_id, failed = count, %detail, "dropped queued runs");
        }
        count
    }
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
