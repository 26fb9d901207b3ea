// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent FIFO queues and the ready ring the workers draw from.
//!
//! Each agent has its own entry behind its own lock. An agent is *ready*
//! when its queue is non-empty, nothing of it is in flight, and it is not
//! paused. Ready agents sit in a ring in the order they became ready;
//! workers pop from the front and an agent that is still ready after a run
//! goes to the back, so agents take turns.
//!
//! Lock order is always queue map, then entry, then ring.

use crate::error::SchedulerInvariantViolation;
use crate::handle::SignalTracker;
use parking_lot::{Mutex, RwLock};
use portico_core::{AgentId, Signal, SignalId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A run signal waiting for (or holding) a worker.
pub struct QueuedRun {
    pub signal: Signal,
    pub tracker: SignalTracker,
}

/// Work handed to a worker by [`QueueSet::next_ready`].
pub struct Dispatch {
    pub agent_id: AgentId,
    pub run: QueuedRun,
    /// Cancelled when a sync supersedes this run.
    pub cancel: CancellationToken,
}

pub struct AgentQueue {
    agent_id: AgentId,
    items: VecDeque<QueuedRun>,
    in_flight: Option<SignalId>,
    cancel: Option<CancellationToken>,
    /// Present in the ready ring.
    scheduled: bool,
    paused: bool,
}

impl AgentQueue {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            items: VecDeque::new(),
            in_flight: None,
            cancel: None,
            scheduled: false,
            paused: false,
        }
    }

    pub fn enqueue(&mut self, run: QueuedRun) {
        self.items.push_back(run);
    }

    /// Id of the head signal, if the queue may dispatch right now.
    pub fn peek_ready(&self) -> Option<SignalId> {
        if self.in_flight.is_some() || self.paused {
            return None;
        }
        self.items.front().map(|r| r.signal.id)
    }

    pub fn is_ready(&self) -> bool {
        self.peek_ready().is_some()
    }

    pub fn mark_in_flight(&mut self, id: SignalId) -> Result<(), SchedulerInvariantViolation> {
        if let Some(in_flight) = self.in_flight {
            return Err(SchedulerInvariantViolation::DoubleDispatch {
                agent: self.agent_id.clone(),
                in_flight,
                requested: id,
            });
        }
        self.in_flight = Some(id);
        Ok(())
    }

    pub fn mark_done(&mut self, id: SignalId) -> Result<(), SchedulerInvariantViolation> {
        if self.in_flight != Some(id) {
            return Err(SchedulerInvariantViolation::UnexpectedDone {
                agent: self.agent_id.clone(),
                finished: id,
                in_flight: self.in_flight,
            });
        }
        self.in_flight = None;
        self.cancel = None;
        Ok(())
    }

    pub fn in_flight(&self) -> Option<SignalId> {
        self.in_flight
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// All agent queues plus the ready ring.
pub struct QueueSet {
    queues: RwLock<HashMap<AgentId, Arc<Mutex<AgentQueue>>>>,
    ready: Mutex<VecDeque<AgentId>>,
    /// Wakes parked workers when an agent becomes ready.
    work: Notify,
    /// Wakes waiters when an in-flight run finishes.
    idle: Notify,
}

impl Default for QueueSet {
    fn default() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            ready: Mutex::new(VecDeque::new()),
            work: Notify::new(),
            idle: Notify::new(),
        }
    }
}

impl QueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The agent's queue, created on first use.
    pub fn entry(&self, agent_id: &AgentId) -> Arc<Mutex<AgentQueue>> {
        if let Some(entry) = self.queues.read().get(agent_id) {
            return Arc::clone(entry);
        }
        let mut queues = self.queues.write();
        let entry = queues
            .entry(agent_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(AgentQueue::new(agent_id.clone()))));
        Arc::clone(entry)
    }

    pub fn get(&self, agent_id: &AgentId) -> Option<Arc<Mutex<AgentQueue>>> {
        self.queues.read().get(agent_id).cloned()
    }

    pub fn agents(&self) -> Vec<AgentId> {
        self.queues.read().keys().cloned().collect()
    }

    /// Append a run to its agent's queue. Never blocks on a worker.
    pub fn enqueue(&self, agent_id: &AgentId, run: QueuedRun) {
        let entry = self.entry(agent_id);
        let mut queue = entry.lock();
        queue.enqueue(run);
        self.schedule_if_ready(agent_id, &mut queue);
    }

    /// Pop the next runnable head, marking it in flight.
    ///
    /// Returns `Ok(None)` when nothing is ready.
    pub fn next_ready(&self) -> Result<Option<Dispatch>, SchedulerInvariantViolation> {
        loop {
            let Some(agent_id) = self.ready.lock().pop_front() else {
                return Ok(None);
            };
            let Some(entry) = self.get(&agent_id) else {
                continue;
            };
            let mut queue = entry.lock();
            queue.scheduled = false;
            let Some(id) = queue.peek_ready() else {
                continue;
            };
            queue.mark_in_flight(id)?;
            let Some(run) = queue.items.pop_front() else {
                continue;
            };
            let cancel = CancellationToken::new();
            queue.cancel = Some(cancel.clone());
            // Pass the baton so another parked worker picks up the rest.
            if !self.ready.lock().is_empty() {
                self.work.notify_one();
            }
            return Ok(Some(Dispatch { agent_id, run, cancel }));
        }
    }

    /// Release the agent after its in-flight run finished.
    pub fn mark_done(
        &self,
        agent_id: &AgentId,
        id: SignalId,
    ) -> Result<(), SchedulerInvariantViolation> {
        let Some(entry) = self.get(agent_id) else {
            return Err(SchedulerInvariantViolation::UnexpectedDone {
                agent: agent_id.clone(),
                finished: id,
                in_flight: None,
            });
        };
        let mut queue = entry.lock();
        queue.mark_done(id)?;
        self.schedule_if_ready(agent_id, &mut queue);
        drop(queue);
        self.idle.notify_waiters();
        Ok(())
    }

    /// Stop dispatching from these agents. Queued runs stay queued.
    pub fn pause(&self, agents: &[AgentId]) {
        for agent_id in agents {
            self.entry(agent_id).lock().paused = true;
        }
    }

    pub fn resume(&self, agents: &[AgentId]) {
        for agent_id in agents {
            let entry = self.entry(agent_id);
            let mut queue = entry.lock();
            queue.paused = false;
            self.schedule_if_ready(agent_id, &mut queue);
        }
    }

    /// Ask the in-flight runs of these agents to stop at the next step
    /// boundary. Returns the signals that were asked.
    pub fn cancel_in_flight(&self, agents: &[AgentId]) -> Vec<SignalId> {
        let mut cancelled = Vec::new();
        for agent_id in agents {
            let Some(entry) = self.get(agent_id) else { continue };
            let queue = entry.lock();
            if let (Some(id), Some(token)) = (queue.in_flight, queue.cancel.as_ref()) {
                token.cancel();
                cancelled.push(id);
            }
        }
        cancelled
    }

    /// Wait until none of these agents has a run in flight.
    pub async fn wait_idle(&self, agents: &[AgentId]) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let busy = agents
                .iter()
                .any(|a| self.get(a).is_some_and(|e| e.lock().in_flight().is_some()));
            if !busy {
                return;
            }
            notified.await;
        }
    }

    /// Remove the agent's queue, handing back whatever was still queued.
    /// A run already in flight finishes normally; its entry stays until
    /// then so the worker can release it.
    pub fn remove(&self, agent_id: &AgentId) -> Vec<QueuedRun> {
        let mut queues = self.queues.write();
        let Some(entry) = queues.get(agent_id).cloned() else {
            return Vec::new();
        };
        let mut queue = entry.lock();
        let drained = queue.items.drain(..).collect();
        if queue.in_flight.is_none() {
            queues.remove(agent_id);
        }
        drained
    }

    /// Total queued (not in-flight) runs across all agents.
    pub fn pending(&self) -> usize {
        self.queues.read().values().map(|e| e.lock().len()).sum()
    }

    /// Park until [`QueueSet::enqueue`] or a finished run may have made work.
    pub async fn work_available(&self) {
        self.work.notified().await;
    }

    /// Wake every parked worker (used on shutdown).
    pub fn wake_all(&self) {
        self.work.notify_waiters();
    }

    fn schedule_if_ready(&self, agent_id: &AgentId, queue: &mut AgentQueue) {
        if queue.scheduled || !queue.is_ready() {
            return;
        }
        queue.scheduled = true;
        self.ready.lock().push_back(agent_id.clone());
        self.work.notify_one();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
