// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! portico-core: domain types for the portico agent execution engine

pub mod macros;

pub mod agent;
pub mod clock;
pub mod id;
pub mod session;
pub mod signal;
pub mod step;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{Agent, AgentError, AgentState};
#[cfg(any(test, feature = "test-support"))]
pub use agent::AgentBuilder;
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{short, AgentId, CorrelationId, SessionId, SignalId, SignalIdGen, StepId};
pub use session::{RuntimeSession, SessionStatus, StepFailure};
pub use signal::{Signal, SignalError, SignalKind, SignalStatus};
#[cfg(any(test, feature = "test-support"))]
pub use step::StepBuilder;
pub use step::{Step, StepKind};
