// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RuntimeSession: the execution record of one agent run.

use crate::id::{AgentId, SessionId, SignalId, StepId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Running,
    /// Terminal: every step succeeded, or the run stopped at a failing step.
    Completed,
    /// Terminal: aborted from outside (superseded by a sync, agent gone).
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

crate::simple_display! {
    SessionStatus {
        Waiting => "waiting",
        Running => "running",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// Which step failed and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub position: usize,
    pub step_id: StepId,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSession {
    pub id: SessionId,
    pub signal_id: SignalId,
    pub agent_id: AgentId,
    pub status: SessionStatus,
    pub input: Value,
    /// Index of the last step attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_step_idx: Option<usize>,
    /// Most recent step output, or the failure detail once a step failed.
    #[serde(default)]
    pub output: Option<Value>,
    /// Output of every successful step, in position order.
    #[serde(default)]
    pub step_outputs: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
    /// Elapsed seconds per attempted step, in position order.
    #[serde(default)]
    pub step_times: Vec<f64>,
    #[serde(default)]
    pub total_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl RuntimeSession {
    pub fn new(signal_id: SignalId, agent_id: AgentId, input: Value, epoch_ms: u64) -> Self {
        Self {
            id: SessionId::new(),
            signal_id,
            agent_id,
            status: SessionStatus::Waiting,
            input,
            latest_step_idx: None,
            output: None,
            step_outputs: Vec::new(),
            failure: None,
            step_times: Vec::new(),
            total_time: 0.0,
            cancel_reason: None,
            created_at_ms: epoch_ms,
            updated_at_ms: epoch_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Waiting → Running. No-op once the session has left `Waiting`.
    pub fn begin(&mut self, epoch_ms: u64) {
        if self.status == SessionStatus::Waiting {
            self.status = SessionStatus::Running;
            self.updated_at_ms = epoch_ms;
        }
    }

    pub fn record_success(&mut self, idx: usize, output: Value, secs: f64, epoch_ms: u64) {
        if self.is_terminal() {
            return;
        }
        self.latest_step_idx = Some(idx);
        self.step_times.push(secs);
        self.step_outputs.push(output.clone());
        self.output = Some(output);
        self.updated_at_ms = epoch_ms;
    }

    /// Record a failing step. The output becomes the failure detail so the
    /// final result always explains why the run stopped.
    pub fn record_failure(
        &mut self,
        idx: usize,
        step_id: StepId,
        detail: impl Into<String>,
        secs: f64,
        epoch_ms: u64,
    ) {
        if self.is_terminal() {
            return;
        }
        let detail = detail.into();
        self.latest_step_idx = Some(idx);
        self.step_times.push(secs);
        self.output = Some(json!({ "error": detail, "step": idx }));
        self.failure = Some(StepFailure { position: idx, step_id, detail });
        self.updated_at_ms = epoch_ms;
    }

    pub fn complete(&mut self, total_time: f64, epoch_ms: u64) {
        self.finalize(SessionStatus::Completed, total_time, epoch_ms);
    }

    pub fn cancel(&mut self, reason: impl Into<String>, total_time: f64, epoch_ms: u64) {
        if !self.is_terminal() {
            self.cancel_reason = Some(reason.into());
        }
        self.finalize(SessionStatus::Cancelled, total_time, epoch_ms);
    }

    fn finalize(&mut self, status: SessionStatus, total_time: f64, epoch_ms: u64) {
        if self.is_terminal() {
            return;
        }
        self.status = status;
        self.total_time = total_time;
        self.updated_at_ms = epoch_ms;
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Whether the run finished every step without failure.
    pub fn succeeded(&self) -> bool {
        self.status == SessionStatus::Completed && self.failure.is_none()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
