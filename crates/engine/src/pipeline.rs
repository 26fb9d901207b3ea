// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run pipeline: one agent run from dispatch to finalized session

use crate::executor::StepExecutor;
use crate::handle::SignalTracker;
use portico_adapters::{ModelAdapter, SandboxAdapter};
use portico_core::{Agent, AgentId, Clock, RuntimeSession, Signal};
use portico_storage::Store;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Detail recorded on signals whose run a sync superseded.
pub const CANCELLED_BY_SYNC: &str = "cancelled by sync";

/// Final state of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub signal: Signal,
    pub session: RuntimeSession,
    /// Whether the final signal and session writes reached the store.
    pub persisted: bool,
}

pub struct RunPipeline<S, X, M, C: Clock> {
    store: S,
    executor: StepExecutor<X, M, C>,
    clock: C,
}

impl<S, X, M, C> RunPipeline<S, X, M, C>
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    pub fn new(store: S, executor: StepExecutor<X, M, C>, clock: C) -> Self {
        Self { store, executor, clock }
    }

    /// Run the agent's steps against the signal payload.
    ///
    /// The agent definition is read fresh here, not at submit time. The
    /// signal always leaves this function `complete` or `error`.
    pub async fn run(
        &self,
        agent_id: &AgentId,
        mut signal: Signal,
        tracker: &SignalTracker,
        cancel: &CancellationToken,
    ) -> RunReport {
        let start = self.clock.now();
        let mut session = RuntimeSession::new(
            signal.id,
            agent_id.clone(),
            signal.payload.clone(),
            self.clock.epoch_ms(),
        );
        session.begin(self.clock.epoch_ms());
        if let Err(e) = signal.begin_processing(Some(session.id.clone()), self.clock.epoch_ms()) {
            tracing::error!(signal = %signal.id, error = %e, "dispatched signal was not pending");
        }
        tracker.publish(&signal);
        self.persist(&signal, &session).await;

        tracing::info!(
            agent = %agent_id,
            signal = %signal.id,
            session = %session.id,
            "run started"
        );

        let agent = match self.resolve(agent_id).await {
            Ok(agent) => agent,
            Err(detail) => {
                tracing::warn!(agent = %agent_id, signal = %signal.id, %detail, "run abandoned");
                session.cancel(detail.clone(), self.clock.secs_since(start), self.clock.epoch_ms());
                return self.finish(signal, session, Err(detail), tracker).await;
            }
        };

        let mut current = signal.payload.clone();
        if agent.steps.is_empty() {
            session.output = Some(current.clone());
        }

        let mut outcome: Result<Value, String> = Ok(current.clone());
        for (idx, step) in agent.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    agent = %agent_id,
                    signal = %signal.id,
                    session = %session.id,
                    next_step = idx,
                    "run superseded by sync"
                );
                session.cancel("superseded by sync", self.clock.secs_since(start), self.clock.epoch_ms());
                outcome = Err(CANCELLED_BY_SYNC.to_string());
                break;
            }

            let executed = self.executor.execute(step, &current).await;
            let elapsed_ms = executed.elapsed * 1000.0;
            let succeeded = executed.result.is_ok();
            if let Err(e) = self.store.record_step_run(agent_id, &step.id, succeeded).await {
                tracing::warn!(agent = %agent_id, step = %step.id, error = %e, "step counters not persisted");
            }

            match executed.result {
                Ok(output) => {
                    tracing::debug!(
                        agent = %agent_id,
                        session = %session.id,
                        step = idx,
                        kind = %step.kind,
                        attempts = executed.attempts,
                        elapsed_ms,
                        "step completed"
                    );
                    session.record_success(idx, output.clone(), executed.elapsed, self.clock.epoch_ms());
                    current = output;
                    outcome = Ok(current.clone());
                }
                Err(e) => {
                    let detail = format!("step {idx} ({}) failed: {e}", step.kind);
                    tracing::warn!(
                        agent = %agent_id,
                        session = %session.id,
                        step = idx,
                        attempts = executed.attempts,
                        elapsed_ms,
                        error = %e,
                        "step failed"
                    );
                    session.record_failure(
                        idx,
                        step.id.clone(),
                        detail.clone(),
                        executed.elapsed,
                        self.clock.epoch_ms(),
                    );
                    outcome = Err(detail);
                    break;
                }
            }

            if let Err(e) = self.store.save_session(&session).await {
                tracing::warn!(session = %session.id, error = %e, "session progress not persisted");
            }
        }

        session.complete(self.clock.secs_since(start), self.clock.epoch_ms());
        self.finish(signal, session, outcome, tracker).await
    }

    async fn resolve(&self, agent_id: &AgentId) -> Result<Agent, String> {
        let mut agent = match self.store.get_agent(agent_id).await {
            Ok(Some(agent)) => agent,
            Ok(None) => return Err(format!("agent {agent_id} not found")),
            Err(e) => return Err(format!("agent {agent_id} could not be loaded: {e}")),
        };
        if !agent.accepts_runs() {
            return Err(format!("agent {agent_id} is {}", agent.state));
        }
        agent.validate().map_err(|e| e.to_string())?;
        Ok(agent)
    }

    async fn finish(
        &self,
        mut signal: Signal,
        session: RuntimeSession,
        outcome: Result<Value, String>,
        tracker: &SignalTracker,
    ) -> RunReport {
        let now = self.clock.epoch_ms();
        let transition = match outcome {
            Ok(output) => signal.complete(Some(output), now),
            Err(detail) => signal.fail(detail, now),
        };
        if let Err(e) = transition {
            tracing::error!(signal = %signal.id, error = %e, "signal already finalized");
        }
        let persisted = self.persist(&signal, &session).await;
        tracker.publish(&signal);
        tracing::info!(
            agent = %session.agent_id,
            signal = %signal.id,
            session = %session.id,
            status = %signal.status,
            latest_step = ?session.latest_step_idx,
            total_ms = session.total_time * 1000.0,
            "run finished"
        );
        RunReport { signal, session, persisted }
    }

    /// Write both records. Failures are logged, never propagated.
    pub async fn persist(&self, signal: &Signal, session: &RuntimeSession) -> bool {
        let mut ok = true;
        if let Err(e) = self.store.save_session(session).await {
            tracing::warn!(session = %session.id, error = %e, "session not persisted");
            ok = false;
        }
        if let Err(e) = self.store.save_signal(signal).await {
            tracing::warn!(signal = %signal.id, error = %e, "signal not persisted");
            ok = false;
        }
        ok
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
