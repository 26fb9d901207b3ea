// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store failures during and after runs.

use super::*;
use portico_core::SignalStatus;
use portico_storage::{JournalStore, Store};
use tempfile::tempdir;

#[tokio::test]
async fn failed_final_write_is_retried_on_sync() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    ctx.store.set_fail_writes(true);

    let signal = ctx.run_to_end("agt-a", json!({ "x": 1 })).await;
    assert_eq!(signal.status, SignalStatus::Complete);
    let engine = &ctx.engine;
    eventually("run to be listed as unpersisted", || engine.unpersisted() == 1).await;
    assert_eq!(ctx.engine.get_signal(signal.id).await.unwrap(), None);

    ctx.store.set_fail_writes(false);
    let sync = ctx.engine.submit(SignalRequest::sync(json!({}))).await.unwrap().signal();

    assert_eq!(sync.status, SignalStatus::Complete);
    assert_eq!(ctx.engine.unpersisted(), 0);
    let stored = ctx.engine.get_signal(signal.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Complete);
    assert!(ctx.session_of(&stored).await.succeeded());
}

#[tokio::test]
async fn sync_keeps_runs_that_still_cannot_be_written() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    ctx.store.set_fail_writes(true);

    ctx.run_to_end("agt-a", json!({})).await;
    let engine = &ctx.engine;
    eventually("run to be listed as unpersisted", || engine.unpersisted() == 1).await;

    ctx.engine.submit(SignalRequest::sync(json!({}))).await.unwrap();
    assert_eq!(ctx.engine.unpersisted(), 1);
}

#[tokio::test]
async fn journal_backed_engine_resumes_after_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("journal.jsonl");

    let first_id = {
        let store = JournalStore::open(&path).unwrap();
        let deps = EngineDeps { store, sandbox: FakeSandbox::new(), model: FakeModel::new() };
        let engine = Engine::start(deps, FakeClock::new(), test_config()).await.unwrap();
        assert!(engine.create_agent(passthrough_agent("agt-a", 2)).await.success);
        let mut handle = engine.submit(SignalRequest::run("agt-a", json!({ "x": 1 }))).await.unwrap();
        let done = finished(&mut handle).await;
        engine.shutdown().await.unwrap();
        done.id
    };

    let store = JournalStore::open(&path).unwrap();
    let agent = store.get_agent(&AgentId::from("agt-a")).await.unwrap().unwrap();
    assert_eq!(agent.steps.iter().map(|s| s.run_count).collect::<Vec<_>>(), vec![1, 1]);

    let deps = EngineDeps { store, sandbox: FakeSandbox::new(), model: FakeModel::new() };
    let engine = Engine::start(deps, FakeClock::new(), test_config()).await.unwrap();
    let stored = engine.get_signal(first_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Complete);

    let next = engine.submit(SignalRequest::fyi(json!(null))).await.unwrap();
    assert!(next.id() > first_id);
    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn finished_correlation_id_is_remembered_across_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("journal.jsonl");
    let request = || SignalRequest::run("agt-a", json!({ "x": 1 })).with_correlation_id("order-7");

    let first = {
        let store = JournalStore::open(&path).unwrap();
        let deps = EngineDeps { store, sandbox: FakeSandbox::new(), model: FakeModel::new() };
        let engine = Engine::start(deps, FakeClock::new(), test_config()).await.unwrap();
        assert!(engine.create_agent(passthrough_agent("agt-a", 1)).await.success);
        let mut handle = engine.submit(request()).await.unwrap();
        let done = finished(&mut handle).await;
        engine.shutdown().await.unwrap();
        done
    };

    let sandbox = FakeSandbox::new();
    let store = JournalStore::open(&path).unwrap();
    let deps = EngineDeps { store, sandbox: sandbox.clone(), model: FakeModel::new() };
    let engine = Engine::start(deps, FakeClock::new(), test_config()).await.unwrap();

    let again = engine.submit(request()).await.unwrap().signal();
    assert_eq!(again.id, first.id);
    assert_eq!(again.status, SignalStatus::Complete);
    assert_eq!(again.session_id, first.session_id);
    assert!(sandbox.calls().is_empty());
    engine.shutdown().await.unwrap();
}
