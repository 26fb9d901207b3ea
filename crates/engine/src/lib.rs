// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! portico-engine: signal intake, per-agent queues, and the run pipeline

mod catalog;
mod config;
mod dedup;
mod dispatcher;
mod engine;
mod error;
mod executor;
mod handle;
mod intake;
mod pipeline;
mod queue;
mod retry;
pub mod template;

pub use catalog::{CommandResponse, AGENT_DELETED};
pub use config::{default_workers, EngineConfig, DEFAULT_MODEL};
pub use engine::{Engine, EngineDeps, INTERRUPTED};
pub use error::{EngineError, ExecutionError, SchedulerInvariantViolation, ValidationError};
pub use executor::{parse_reply, StepExecutor, StepOutcome};
pub use handle::SignalHandle;
pub use intake::{SignalRequest, SyncScope};
pub use pipeline::{RunReport, CANCELLED_BY_SYNC};
pub use retry::{retry, Retried, RetryPolicy};
pub use template::TemplateError;
