// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steps: the typed units of work inside an agent's workflow.

use crate::id::{AgentId, StepId};
use serde::{Deserialize, Serialize};

/// What a step does, with the content each kind needs.
///
/// The set is closed: the executor matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Deterministic source code run in the sandbox.
    Code { source: String },
    /// Template with `{{variable}}` placeholders sent to a model.
    Prompt {
        template: String,
        /// Model identifier; the engine default applies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
}

impl StepKind {
    pub fn code(source: impl Into<String>) -> Self {
        StepKind::Code { source: source.into() }
    }

    pub fn prompt(template: impl Into<String>) -> Self {
        StepKind::Prompt { template: template.into(), model: None }
    }

    /// Raw content: source code or prompt template.
    pub fn content(&self) -> &str {
        match self {
            StepKind::Code { source } => source,
            StepKind::Prompt { template, .. } => template,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, StepKind::Code { .. })
    }

    pub fn is_prompt(&self) -> bool {
        matches!(self, StepKind::Prompt { .. })
    }
}

crate::simple_display! {
    StepKind {
        Code { .. } => "code",
        Prompt { .. } => "prompt",
    }
}

/// One action within an agent's workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub agent_id: AgentId,
    /// Sequence number, unique within the owning agent.
    pub position: usize,
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub success_count: u64,
}

impl Step {
    pub fn new(agent_id: AgentId, position: usize, kind: StepKind) -> Self {
        Self {
            id: StepId::new(),
            agent_id,
            position,
            kind,
            description: None,
            run_count: 0,
            success_count: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Count one execution of this step.
    pub fn record_run(&mut self, succeeded: bool) {
        self.run_count += 1;
        if succeeded {
            self.success_count += 1;
        }
    }
}

crate::builder! {
    pub struct StepBuilder => Step {
        into {
            id: StepId = StepId::new(),
            agent_id: AgentId = "agt-test",
        }
        set {
            position: usize = 0,
            kind: StepKind = StepKind::code("result = source"),
        }
        option {
            description: String = None,
        }
        computed {
            run_count: u64 = 0,
            success_count: u64 = 0,
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
