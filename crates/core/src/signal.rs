// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signals: events that request or report work.

use crate::id::{AgentId, CorrelationId, SessionId, SignalId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What a signal asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Run the target agent against the payload. `command` is accepted as
    /// an alias on input.
    #[serde(alias = "command")]
    Run,
    /// Re-resolve agent definitions for a scope.
    Sync,
    /// Informational; recorded and completed without execution.
    Fyi,
}

crate::simple_display! {
    SignalKind {
        Run => "run",
        Sync => "sync",
        Fyi => "fyi",
    }
}

impl std::str::FromStr for SignalKind {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" | "command" => Ok(SignalKind::Run),
            "sync" => Ok(SignalKind::Sync),
            "fyi" => Ok(SignalKind::Fyi),
            other => Err(SignalError::UnknownKind(other.to_string())),
        }
    }
}

/// Processing status. Only ever moves forward; `Complete` and `Error` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Pending,
    Processing,
    Complete,
    Error,
}

impl SignalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SignalStatus::Complete | SignalStatus::Error)
    }
}

crate::simple_display! {
    SignalStatus {
        Pending => "pending",
        Processing => "processing",
        Complete => "complete",
        Error => "error",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("unknown signal kind: {0}")]
    UnknownKind(String),
    #[error("signal {id} cannot move from {from} to {to}")]
    Regression { id: SignalId, from: SignalStatus, to: SignalStatus },
}

/// An event that may request work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    pub kind: SignalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub payload: Value,
    pub status: SignalStatus,
    /// Human-readable failure detail; present iff status is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Response payload (final step output for runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// Session produced by a run, set once processing starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Signal {
    pub fn new(
        id: SignalId,
        kind: SignalKind,
        agent_id: Option<AgentId>,
        payload: Value,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id,
            correlation_id: None,
            kind,
            agent_id,
            payload,
            status: SignalStatus::Pending,
            error: None,
            response: None,
            session_id: None,
            created_at_ms: epoch_ms,
            updated_at_ms: epoch_ms,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending → Processing, linking the session that will run it.
    pub fn begin_processing(
        &mut self,
        session_id: Option<SessionId>,
        epoch_ms: u64,
    ) -> Result<(), SignalError> {
        self.advance(SignalStatus::Processing, epoch_ms)?;
        self.session_id = session_id;
        Ok(())
    }

    /// → Complete with a response payload.
    pub fn complete(&mut self, response: Option<Value>, epoch_ms: u64) -> Result<(), SignalError> {
        self.advance(SignalStatus::Complete, epoch_ms)?;
        self.response = response;
        Ok(())
    }

    /// → Error with a human-readable detail.
    pub fn fail(&mut self, detail: impl Into<String>, epoch_ms: u64) -> Result<(), SignalError> {
        self.advance(SignalStatus::Error, epoch_ms)?;
        self.error = Some(detail.into());
        Ok(())
    }

    fn advance(&mut self, to: SignalStatus, epoch_ms: u64) -> Result<(), SignalError> {
        if self.status.is_terminal() || to <= self.status {
            return Err(SignalError::Regression { id: self.id, from: self.status, to });
        }
        self.status = to;
        self.updated_at_ms = epoch_ms;
        Ok(())
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
