// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! portico-adapters: collaborators that run step content

pub mod model;
pub mod sandbox;

pub use model::{HttpModelAdapter, ModelAdapter, ModelError};
pub use sandbox::{PythonSandbox, SandboxAdapter, SandboxError};

#[cfg(any(test, feature = "test-support"))]
pub use model::{FakeModel, ModelCall};
#[cfg(any(test, feature = "test-support"))]
pub use sandbox::{FakeSandbox, SandboxCall};
