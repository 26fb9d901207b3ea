// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine: owns the queues, the worker pool, and the run pipeline.

use crate::catalog::CommandResponse;
use crate::config::EngineConfig;
use crate::dedup::DedupTable;
use crate::dispatcher::Dispatcher;
use crate::error::{EngineError, SchedulerInvariantViolation, ValidationError};
use crate::executor::StepExecutor;
use crate::handle::{SignalHandle, SignalTracker};
use crate::intake::SignalRequest;
use crate::pipeline::{RunPipeline, RunReport};
use crate::queue::{QueueSet, QueuedRun};
use parking_lot::Mutex;
use portico_adapters::{ModelAdapter, SandboxAdapter};
use portico_core::{
    Agent, AgentId, Clock, RuntimeSession, SessionId, Signal, SignalId, SignalIdGen, SignalKind,
    SignalStatus,
};
use portico_storage::Store;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Detail recorded on signals left unfinished by a previous process.
pub const INTERRUPTED: &str = "interrupted by restart";

/// External collaborators the engine drives.
pub struct EngineDeps<S, X, M> {
    pub store: S,
    pub sandbox: X,
    pub model: M,
}

/// State shared by the engine handle and its workers.
pub(crate) struct Shared<S, X, M, C: Clock> {
    pub(crate) store: S,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
    pub(crate) queues: QueueSet,
    pub(crate) pipeline: RunPipeline<S, X, M, C>,
    pub(crate) ids: SignalIdGen,
    pub(crate) dedup: Mutex<DedupTable>,
    /// One sync at a time, so pause and resume never interleave.
    pub(crate) sync_lock: tokio::sync::Mutex<()>,
    /// Finished runs whose final write failed; retried on sync.
    pub(crate) unpersisted: Mutex<Vec<RunReport>>,
    /// Cancelled on shutdown or on a fatal scheduler error.
    pub(crate) stopping: CancellationToken,
    pub(crate) fatal: Mutex<Option<SchedulerInvariantViolation>>,
}

impl<S, X, M, C> Shared<S, X, M, C>
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    /// Record a fatal scheduler error and stop all workers.
    pub(crate) fn fail(&self, violation: SchedulerInvariantViolation) {
        tracing::error!(error = %violation, "scheduler invariant violated, stopping engine");
        self.fatal.lock().get_or_insert(violation);
        self.stopping.cancel();
        self.queues.wake_all();
    }

    /// Finalize a signal as `error` outside the pipeline.
    pub(crate) async fn reject(&self, mut signal: Signal, tracker: &SignalTracker, detail: String) {
        if let Err(e) = signal.fail(detail, self.clock.epoch_ms()) {
            tracing::error!(signal = %signal.id, error = %e, "signal already finalized");
        }
        if let Err(e) = self.store.save_signal(&signal).await {
            tracing::warn!(signal = %signal.id, error = %e, "signal not persisted");
        }
        tracker.publish(&signal);
    }

    /// Write back runs whose final persist failed. Those that fail again
    /// stay listed.
    pub(crate) async fn retry_unpersisted(&self) -> usize {
        let pending = std::mem::take(&mut *self.unpersisted.lock());
        if pending.is_empty() {
            return 0;
        }
        let mut written = 0;
        let mut still = Vec::new();
        for mut report in pending {
            if self.pipeline.persist(&report.signal, &report.session).await {
                report.persisted = true;
                written += 1;
            } else {
                still.push(report);
            }
        }
        tracing::info!(written, remaining = still.len(), "retried unpersisted runs");
        self.unpersisted.lock().extend(still);
        written
    }
}

/// The agent execution engine.
///
/// Accepts signals, runs each agent's queue one signal at a time, and lets
/// different agents run in parallel on a fixed worker pool.
pub struct Engine<S, X, M, C: Clock> {
    shared: Arc<Shared<S, X, M, C>>,
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl<S, X, M, C> Engine<S, X, M, C>
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    /// Recover state from the store and start the worker pool.
    ///
    /// Pending run signals are queued again in id order. Signals that were
    /// mid-flight when the previous process stopped end as `error`.
    pub async fn start(
        deps: EngineDeps<S, X, M>,
        clock: C,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let EngineDeps { store, sandbox, model } = deps;
        let last_id = store.last_signal_id().await?;
        let executor = StepExecutor::new(sandbox, model, clock.clone(), &config);
        let shared = Arc::new(Shared {
            pipeline: RunPipeline::new(store.clone(), executor, clock.clone()),
            queues: QueueSet::new(),
            ids: SignalIdGen::starting_after(last_id),
            dedup: Mutex::new(DedupTable::new(config.dedup_capacity)),
            sync_lock: tokio::sync::Mutex::new(()),
            unpersisted: Mutex::new(Vec::new()),
            stopping: CancellationToken::new(),
            fatal: Mutex::new(None),
            store,
            clock,
            config,
        });

        for agent in shared.store.list_agents().await? {
            shared.queues.entry(&agent.id);
        }
        let recovered = Self::recover(&shared).await?;

        let dispatcher = Dispatcher::spawn(Arc::clone(&shared));
        tracing::info!(
            workers = shared.config.workers,
            last_signal = last_id,
            recovered,
            "engine started"
        );
        Ok(Self { shared, dispatcher: Mutex::new(Some(dispatcher)) })
    }

    async fn recover(shared: &Shared<S, X, M, C>) -> Result<usize, EngineError> {
        // Finished signals keep answering their correlation ids after a restart.
        let finished =
            shared.store.finished_correlated_signals(shared.config.dedup_capacity).await?;
        {
            let mut dedup = shared.dedup.lock();
            for signal in finished {
                if let Some(cid) = signal.correlation_id.clone() {
                    dedup.insert(cid, SignalTracker::new(signal));
                }
            }
        }

        let mut requeued = 0;
        for signal in shared.store.unfinished_signals().await? {
            let tracker = SignalTracker::new(signal.clone());
            if let Some(cid) = signal.correlation_id.clone() {
                shared.dedup.lock().insert(cid, tracker.clone());
            }
            match (&signal.kind, &signal.status, signal.agent_id.clone()) {
                (SignalKind::Run, SignalStatus::Pending, Some(agent_id)) => {
                    shared.queues.enqueue(&agent_id, QueuedRun { signal, tracker });
                    requeued += 1;
                }
                _ => {
                    tracing::warn!(signal = %signal.id, kind = %signal.kind, "abandoning interrupted signal");
                    if let Some(session_id) = signal.session_id.clone() {
                        Self::abandon_session(shared, &session_id).await?;
                    }
                    shared.reject(signal, &tracker, INTERRUPTED.to_string()).await;
                }
            }
        }
        Ok(requeued)
    }

    async fn abandon_session(
        shared: &Shared<S, X, M, C>,
        session_id: &SessionId,
    ) -> Result<(), EngineError> {
        let Some(mut session) = shared.store.get_session(session_id).await? else {
            return Ok(());
        };
        if session.is_terminal() {
            return Ok(());
        }
        session.cancel(INTERRUPTED, session.total_time, shared.clock.epoch_ms());
        shared.store.save_session(&session).await?;
        Ok(())
    }

    /// Accept a signal.
    ///
    /// Never blocks on a worker. A `sync` signal is processed before this
    /// returns; a `run` signal is queued behind its agent's earlier runs.
    pub async fn submit(&self, request: SignalRequest) -> Result<SignalHandle, ValidationError> {
        self.shared.submit(request).await
    }

    /// Validate and store an agent definition.
    pub async fn create_agent(&self, agent: Agent) -> CommandResponse {
        self.shared.create_agent(agent).await
    }

    /// Remove an agent definition, failing its queued signals.
    pub async fn delete_agent(&self, id: &AgentId) -> CommandResponse {
        self.shared.delete_agent(id).await
    }

    pub async fn start_agent(&self, id: &AgentId) -> CommandResponse {
        self.shared.start_agent(id).await
    }

    pub async fn stop_agent(&self, id: &AgentId) -> CommandResponse {
        self.shared.stop_agent(id).await
    }

    pub async fn get_signal(&self, id: SignalId) -> Result<Option<Signal>, EngineError> {
        Ok(self.shared.store.get_signal(id).await?)
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Option<RuntimeSession>, EngineError> {
        Ok(self.shared.store.get_session(id).await?)
    }

    pub async fn get_agent(&self, id: &AgentId) -> Result<Option<Agent>, EngineError> {
        Ok(self.shared.store.get_agent(id).await?)
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, EngineError> {
        let mut agents = self.shared.store.list_agents().await?;
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    /// Queued runs not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.shared.queues.pending()
    }

    /// Finished runs still waiting for their final write.
    pub fn unpersisted(&self) -> usize {
        self.shared.unpersisted.lock().len()
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.stopping.is_cancelled()
    }

    /// Refuse new signals, let in-flight runs finish, stop the workers.
    ///
    /// Queued runs stay `pending` in the store and are picked up again on
    /// the next start.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.shared.stopping.cancel();
        self.shared.queues.wake_all();
        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            tracing::info!(pending = self.pending(), "engine draining");
            dispatcher.join(self.shared.config.drain_timeout).await?;
            tracing::info!("engine stopped");
        }
        match self.shared.fatal.lock().clone() {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    /// Resolve once the engine stops. Returns the fatal error if a
    /// scheduler invariant was violated.
    pub async fn wait(&self) -> Result<(), EngineError> {
        self.shared.stopping.cancelled().await;
        match self.shared.fatal.lock().clone() {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Shared<S, X, M, C> {
        &self.shared
    }
}

#[cfg(test)]
#[path = "engine_tests/mod.rs"]
mod tests;
