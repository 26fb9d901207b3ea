// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool draining the ready ring

use crate::engine::Shared;
use crate::error::EngineError;
use portico_adapters::{ModelAdapter, SandboxAdapter};
use portico_core::Clock;
use portico_storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub(crate) struct Dispatcher {
    workers: JoinSet<()>,
}

impl Dispatcher {
    pub(crate) fn spawn<S, X, M, C>(shared: Arc<Shared<S, X, M, C>>) -> Self
    where
        S: Store,
        X: SandboxAdapter,
        M: ModelAdapter,
        C: Clock,
    {
        let mut workers = JoinSet::new();
        for index in 0..shared.config.workers.max(1) {
            workers.spawn(worker_loop(index, Arc::clone(&shared)));
        }
        Self { workers }
    }

    /// Wait for every worker to exit. Workers still busy after `timeout`
    /// are aborted.
    pub(crate) async fn join(mut self, timeout: Duration) -> Result<(), EngineError> {
        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = self.workers.join_next().await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "worker task failed");
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(remaining = self.workers.len(), "drain timed out, aborting workers");
            self.workers.abort_all();
            return Err(EngineError::DrainTimeout(timeout));
        }
        Ok(())
    }
}

async fn worker_loop<S, X, M, C>(index: usize, shared: Arc<Shared<S, X, M, C>>)
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    tracing::debug!(worker = index, "worker started");
    loop {
        if shared.stopping.is_cancelled() {
            break;
        }
        let dispatch = match shared.queues.next_ready() {
            Ok(Some(dispatch)) => dispatch,
            Ok(None) => {
                tokio::select! {
                    _ = shared.queues.work_available() => continue,
                    _ = shared.stopping.cancelled() => break,
                }
            }
            Err(violation) => {
                shared.fail(violation);
                break;
            }
        };

        let signal_id = dispatch.run.signal.id;
        tracing::debug!(worker = index, agent = %dispatch.agent_id, signal = %signal_id, "dispatching");
        let report = shared
            .pipeline
            .run(&dispatch.agent_id, dispatch.run.signal, &dispatch.run.tracker, &dispatch.cancel)
            .await;
        if !report.persisted {
            shared.unpersisted.lock().push(report);
        }
        if let Err(violation) = shared.queues.mark_done(&dispatch.agent_id, signal_id) {
            shared.fail(violation);
            break;
        }
    }
    tracing::debug!(worker = index, "worker stopped");
}
