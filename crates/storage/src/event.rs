// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store mutations, as journaled.

use portico_core::{Agent, AgentId, RuntimeSession, Signal, StepId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    AgentSaved { agent: Agent },
    AgentDeleted { id: AgentId },
    StepRan { agent_id: AgentId, step_id: StepId, succeeded: bool },
    SignalSaved { signal: Signal },
    SessionSaved { session: RuntimeSession },
}

portico_core::simple_display! {
    StoreEvent {
        AgentSaved { .. } => "agent:saved",
        AgentDeleted { .. } => "agent:deleted",
        StepRan { .. } => "step:ran",
        SignalSaved { .. } => "signal:saved",
        SessionSaved { .. } => "session:saved",
    }
}
