// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use portico_core::{Agent, AgentId, SessionId, SignalId};
use portico_engine::{SignalRequest, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request from a client to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Submit a signal (`run`, `sync`, or `fyi`)
    Submit {
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_id: Option<AgentId>,
        #[serde(default)]
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation_id: Option<String>,
    },

    /// Store an agent definition, replacing one with the same id
    CreateAgent { agent: Agent },

    DeleteAgent { id: AgentId },

    /// Let an inactive agent accept runs again
    StartAgent { id: AgentId },

    StopAgent { id: AgentId },

    GetSignal { id: SignalId },

    GetSession { id: SessionId },

    ListAgents,

    /// Request daemon shutdown
    Shutdown,
}

impl Request {
    /// Build a `Submit` request.
    pub fn submit(kind: &str, agent_id: Option<&str>, payload: Value) -> Self {
        Request::Submit {
            kind: kind.to_string(),
            agent_id: agent_id.map(AgentId::from),
            payload,
            correlation_id: None,
        }
    }

    /// Convert a `Submit` into the engine's intake form.
    ///
    /// Returns `None` for every other request.
    pub fn into_signal_request(self) -> Option<Result<SignalRequest, ValidationError>> {
        let Request::Submit { kind, agent_id, payload, correlation_id } = self else {
            return None;
        };
        Some(SignalRequest::parse_kind(&kind).map(|kind| SignalRequest {
            kind,
            agent_id,
            payload,
            correlation_id: correlation_id.map(Into::into),
        }))
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
