// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use portico_core::{Agent, RuntimeSession, Signal};
use portico_engine::CommandResponse;
use serde::{Deserialize, Serialize};

/// Response from the daemon to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Health check response
    Pong,

    /// A signal as recorded at the time of the reply
    Signal { signal: Box<Signal> },

    /// Outcome of an agent command
    Command(CommandResponse),

    Session { session: Option<Box<RuntimeSession>> },

    Agents { agents: Vec<Agent> },

    /// Request was rejected or failed
    Error { message: String },

    /// Daemon is shutting down
    ShuttingDown,
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }
}
