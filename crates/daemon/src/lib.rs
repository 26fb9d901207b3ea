// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portico daemon library
//!
//! The `porticod` binary is a thin wrapper over these modules; the
//! protocol and client are exposed for callers talking to a running daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod logging;
pub mod protocol;

pub use client::{ClientError, DaemonClient};
pub use lifecycle::{startup, Config, DaemonState, LifecycleError, StartupResult};
pub use listener::{ListenCtx, Listener};
pub use protocol::{ProtocolError, Request, Response};
