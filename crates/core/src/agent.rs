// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent definitions and lifecycle state.
//!
//! An agent is a named, ordered workflow of steps. Definitions are owned
//! by the configuration side; the engine reads them fresh at dispatch time.

use crate::id::AgentId;
use crate::step::{Step, StepKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of an agent.
///
/// ```text
///            start         mark_unstable
///  Inactive ───────► Stable ───────────► Unstable
///      ▲               ▲   ◄─────────────   │
///      │               │    mark_stable     │
///      └───────────────┴────────────────────┘
///                    stop
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Inactive,
    Stable,
    Unstable,
}

impl AgentState {
    /// Inactive agents reject new `run` signals.
    pub fn accepts_runs(self) -> bool {
        !matches!(self, AgentState::Inactive)
    }
}

crate::simple_display! {
    AgentState {
        Inactive => "inactive",
        Stable => "stable",
        Unstable => "unstable",
    }
}

impl std::str::FromStr for AgentState {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inactive" => Ok(AgentState::Inactive),
            "stable" => Ok(AgentState::Stable),
            "unstable" => Ok(AgentState::Unstable),
            other => Err(AgentError::UnknownState(other.to_string())),
        }
    }
}

/// Errors from agent definition checks and state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("agent {agent} cannot {action} while {state}")]
    InvalidTransition { agent: AgentId, action: &'static str, state: AgentState },
    #[error("unknown agent state: {0}")]
    UnknownState(String),
    #[error("agent id must not be empty")]
    MissingId,
    #[error("step {step} belongs to agent {owner}, not {agent}")]
    ForeignStep { agent: AgentId, step: String, owner: AgentId },
    #[error("agent {agent} steps must occupy positions 0..{len} exactly once (found {found:?})")]
    StepOrder { agent: AgentId, len: usize, found: Vec<usize> },
}

/// A named, ordered workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: AgentState,
    /// Steps in execution order once [`Agent::validate`] has passed.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Acceptable historical failure rate (0.0..=1.0) before the agent is
    /// considered unstable. Stored with the definition; the scheduler does
    /// not read it.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
}

fn default_failure_threshold() -> f64 {
    0.2
}

impl Agent {
    pub fn new(id: AgentId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            state: AgentState::Inactive,
            steps: Vec::new(),
            failure_threshold: default_failure_threshold(),
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    /// Append a step of the given kind at the next free position.
    pub fn push_step(&mut self, kind: StepKind) -> &Step {
        let position = self.steps.len();
        self.steps.push(Step::new(self.id.clone(), position, kind));
        &self.steps[position]
    }

    /// Sort steps by position and check the order is total with no gaps
    /// and that every step is owned by this agent.
    pub fn validate(&mut self) -> Result<(), AgentError> {
        if self.id.is_empty() {
            return Err(AgentError::MissingId);
        }
        if let Some(step) = self.steps.iter().find(|s| s.agent_id != self.id) {
            return Err(AgentError::ForeignStep {
                agent: self.id.clone(),
                step: step.id.to_string(),
                owner: step.agent_id.clone(),
            });
        }
        self.steps.sort_by_key(|s| s.position);
        let in_order = self.steps.iter().enumerate().all(|(i, s)| s.position == i);
        if !in_order {
            return Err(AgentError::StepOrder {
                agent: self.id.clone(),
                len: self.steps.len(),
                found: self.steps.iter().map(|s| s.position).collect(),
            });
        }
        Ok(())
    }

    pub fn accepts_runs(&self) -> bool {
        self.state.accepts_runs()
    }

    /// Inactive → Stable
    pub fn start(&mut self) -> Result<(), AgentError> {
        self.transition("start", |s| matches!(s, AgentState::Inactive), AgentState::Stable)
    }

    /// Stable/Unstable → Inactive
    pub fn stop(&mut self) -> Result<(), AgentError> {
        self.transition("stop", AgentState::accepts_runs, AgentState::Inactive)
    }

    /// Stable → Unstable
    pub fn mark_unstable(&mut self) -> Result<(), AgentError> {
        self.transition("become unstable", |s| s == AgentState::Stable, AgentState::Unstable)
    }

    /// Unstable → Stable
    pub fn mark_stable(&mut self) -> Result<(), AgentError> {
        self.transition("become stable", |s| s == AgentState::Unstable, AgentState::Stable)
    }

    fn transition(
        &mut self,
        action: &'static str,
        allowed: impl Fn(AgentState) -> bool,
        next: AgentState,
    ) -> Result<(), AgentError> {
        if !allowed(self.state) {
            return Err(AgentError::InvalidTransition {
                agent: self.id.clone(),
                action,
                state: self.state,
            });
        }
        self.state = next;
        Ok(())
    }
}

crate::builder! {
    pub struct AgentBuilder => Agent {
        into {
            id: AgentId = "agt-test",
            description: String = "test agent",
        }
        set {
            state: AgentState = AgentState::Stable,
            steps: Vec<Step> = Vec::new(),
            failure_threshold: f64 = 0.2,
        }
        computed {
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl AgentBuilder {
    /// Replace the steps with one step per kind, owned by this agent, in order.
    pub fn step_kinds(mut self, kinds: impl IntoIterator<Item = StepKind>) -> Self {
        self.steps = kinds
            .into_iter()
            .enumerate()
            .map(|(position, kind)| Step::new(self.id.clone(), position, kind))
            .collect();
        self
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
