// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box specs against the `porticod` binary.
//!
//! Build the daemon first (`cargo build --bin porticod`); each spec runs
//! its own daemon against a temporary state directory.

// Allow panic!/unwrap/expect in test code
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/daemon"]
mod daemon {
    mod lifecycle;
    mod recovery;
}

#[path = "specs/signal"]
mod signal {
    mod python;
    mod submit;
}

#[path = "specs/agent"]
mod agent {
    mod commands;
}
