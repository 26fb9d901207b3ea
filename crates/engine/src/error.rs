// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy

use crate::template::TemplateError;
use portico_adapters::{ModelError, SandboxError};
use portico_core::{AgentId, SignalId};
use portico_storage::StoreError;
use std::time::Duration;
use thiserror::Error;

/// A submission was rejected before any signal was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown signal kind: {0}")]
    UnknownKind(String),
    #[error("run signals require a target agent")]
    MissingAgent,
    #[error("invalid sync scope: {0}")]
    InvalidScope(String),
    #[error("sync scope lists no agents")]
    EmptyScope,
    #[error("engine is shutting down")]
    ShuttingDown,
}

/// A single step failed. Recovered by the pipeline, which records the
/// detail on the session and stops the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("code step failed: {0}")]
    Code(#[from] SandboxError),
    #[error("prompt template: {0}")]
    Template(#[from] TemplateError),
    #[error("prompt step failed after {attempts} attempt(s): {source}")]
    Model { attempts: u32, source: ModelError },
}

/// The scheduler's bookkeeping contradicts itself. Fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerInvariantViolation {
    #[error("agent {agent}: signal {requested} dispatched while {in_flight} is in flight")]
    DoubleDispatch { agent: AgentId, in_flight: SignalId, requested: SignalId },
    #[error("agent {agent}: signal {finished} finished but {in_flight:?} was in flight")]
    UnexpectedDone { agent: AgentId, finished: SignalId, in_flight: Option<SignalId> },
}

/// Errors surfaced by [`crate::Engine`] lifecycle calls.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scheduler invariant violated: {0}")]
    Invariant(#[from] SchedulerInvariantViolation),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("in-flight runs did not drain within {}ms", .0.as_millis())]
    DrainTimeout(Duration),
}
