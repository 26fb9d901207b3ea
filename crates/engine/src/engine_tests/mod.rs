// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tests driven through the public API with fake collaborators.

mod lifecycle;
mod ordering;
mod persistence;
mod signals;

use super::*;
use crate::catalog::AGENT_DELETED;
use crate::pipeline::CANCELLED_BY_SYNC;
use crate::retry::RetryPolicy;
use portico_adapters::{FakeModel, FakeSandbox};
use portico_core::test_support::{agent_with, passthrough_agent};
use portico_core::{FakeClock, StepKind};
use portico_storage::MemoryStore;
use serde_json::{json, Value};
use std::time::Duration;

pub(super) type TestEngine = Engine<MemoryStore, FakeSandbox, FakeModel, FakeClock>;

pub(super) struct TestContext {
    pub engine: TestEngine,
    pub store: MemoryStore,
    pub sandbox: FakeSandbox,
    pub model: FakeModel,
    pub clock: FakeClock,
}

pub(super) fn test_config() -> EngineConfig {
    EngineConfig::default()
        .workers(4)
        .retry(RetryPolicy::default())
        .drain_timeout(Duration::from_secs(5))
}

pub(super) async fn setup() -> TestContext {
    setup_with(MemoryStore::new(), FakeSandbox::new(), FakeModel::new(), test_config()).await
}

pub(super) async fn setup_with(
    store: MemoryStore,
    sandbox: FakeSandbox,
    model: FakeModel,
    config: EngineConfig,
) -> TestContext {
    let clock = FakeClock::new();
    let deps = EngineDeps { store: store.clone(), sandbox: sandbox.clone(), model: model.clone() };
    let engine = Engine::start(deps, clock.clone(), config).await.unwrap();
    TestContext { engine, store, sandbox, model, clock }
}

impl TestContext {
    /// Create an agent, asserting the command succeeded.
    pub async fn add_agent(&self, agent: Agent) {
        let response = self.engine.create_agent(agent).await;
        assert!(response.success, "{}", response.message);
    }

    pub async fn run(&self, agent: &str, payload: Value) -> SignalHandle {
        self.engine.submit(SignalRequest::run(agent, payload)).await.unwrap()
    }

    /// Submit a run and wait for it to finish.
    pub async fn run_to_end(&self, agent: &str, payload: Value) -> Signal {
        let mut handle = self.run(agent, payload).await;
        finished(&mut handle).await
    }

    pub async fn session_of(&self, signal: &Signal) -> RuntimeSession {
        let id = signal.session_id.clone().unwrap();
        self.engine.get_session(&id).await.unwrap().unwrap()
    }
}

/// Wait for a handle to reach a terminal status, failing the test on hang.
pub(super) async fn finished(handle: &mut SignalHandle) -> Signal {
    tokio::time::timeout(Duration::from_secs(10), handle.wait())
        .await
        .unwrap_or_else(|_| panic!("signal {} did not finish", handle.id()))
}

/// Poll until `check` holds, failing the test after a few seconds.
pub(super) async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
