// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intake routing: validation, dedup, fyi, sync, unresolvable agents.

use super::*;
use portico_core::{AgentState, SessionStatus, SignalKind, SignalStatus};
use portico_storage::Store;

#[tokio::test]
async fn run_without_agent_is_rejected() {
    let ctx = setup().await;
    let err = ctx
        .engine
        .submit(SignalRequest::new(SignalKind::Run, json!({})))
        .await
        .unwrap_err();
    assert_eq!(err, ValidationError::MissingAgent);
    assert!(ctx.store.events().is_empty());
}

#[tokio::test]
async fn run_for_unknown_agent_errors_without_a_session() {
    let ctx = setup().await;

    let handle = ctx.run("agt-nobody", json!({})).await;
    let signal = handle.signal();

    assert_eq!(signal.status, SignalStatus::Error);
    assert_eq!(signal.error.as_deref(), Some("agent agt-nobody not found"));
    assert!(signal.session_id.is_none());
    assert!(ctx.store.sessions().is_empty());
    assert_eq!(ctx.engine.get_signal(signal.id).await.unwrap(), Some(signal));
}

#[tokio::test]
async fn run_for_inactive_agent_errors_synchronously() {
    let ctx = setup().await;
    let mut agent = passthrough_agent("agt-a", 1);
    agent.state = AgentState::Inactive;
    ctx.add_agent(agent).await;

    let signal = ctx.run("agt-a", json!({})).await.signal();

    assert_eq!(signal.status, SignalStatus::Error);
    assert_eq!(signal.error.as_deref(), Some("agent agt-a is inactive"));
    assert!(ctx.sandbox.calls().is_empty());
}

#[tokio::test]
async fn zero_step_agent_completes_with_payload() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-empty", 0)).await;

    let signal = ctx.run_to_end("agt-empty", json!({ "hello": "world" })).await;
    let session = ctx.session_of(&signal).await;

    assert_eq!(signal.status, SignalStatus::Complete);
    assert_eq!(signal.response, Some(json!({ "hello": "world" })));
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.latest_step_idx, None);
}

#[tokio::test]
async fn fyi_is_recorded_complete_without_execution() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    let handle = ctx
        .engine
        .submit(SignalRequest::fyi(json!({ "note": "deploy finished" })).with_agent("agt-a"))
        .await
        .unwrap();
    let signal = handle.signal();

    assert_eq!(signal.status, SignalStatus::Complete);
    assert!(signal.session_id.is_none());
    assert!(ctx.sandbox.calls().is_empty());
    assert!(ctx.store.sessions().is_empty());
}

#[tokio::test]
async fn duplicate_correlation_id_returns_original_signal() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    let request = SignalRequest::run("agt-a", json!({ "n": 1 })).with_correlation_id("req-1");

    let mut first = ctx.engine.submit(request.clone()).await.unwrap();
    let done = finished(&mut first).await;
    let second = ctx.engine.submit(request).await.unwrap();

    assert_eq!(second.id(), done.id);
    assert_eq!(second.signal(), done);
    assert_eq!(ctx.store.sessions().len(), 1);
    assert_eq!(ctx.sandbox.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_create_one_signal() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    let request = SignalRequest::run("agt-a", json!({})).with_correlation_id("req-race");

    let (a, b) = tokio::join!(ctx.engine.submit(request.clone()), ctx.engine.submit(request));
    let (mut a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.id(), b.id());

    finished(&mut a).await;
    assert_eq!(ctx.store.sessions().len(), 1);
}

#[tokio::test]
async fn signal_ids_increase_monotonically() {
    let ctx = setup().await;
    let mut last = 0;
    for _ in 0..5 {
        let id = ctx.engine.submit(SignalRequest::fyi(json!(null))).await.unwrap().id();
        assert!(id.get() > last);
        last = id.get();
    }
}

#[tokio::test]
async fn sync_returns_current_definitions() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 2)).await;
    ctx.add_agent(passthrough_agent("agt-b", 1)).await;

    let signal = ctx.engine.submit(SignalRequest::sync(json!({ "scope": "all" }))).await.unwrap().signal();

    assert_eq!(signal.status, SignalStatus::Complete);
    let response = signal.response.unwrap();
    assert_eq!(response["agt-a"]["steps"].as_array().map(Vec::len), Some(2));
    assert_eq!(response["agt-b"]["steps"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn specific_sync_only_covers_named_agents() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    ctx.add_agent(passthrough_agent("agt-b", 1)).await;

    let request = SignalRequest::sync(json!({ "scope": "specific", "agents": ["agt-b"] }));
    let response = ctx.engine.submit(request).await.unwrap().signal().response.unwrap();

    assert!(response.get("agt-a").is_none());
    assert!(response.get("agt-b").is_some());
}

#[tokio::test]
async fn sync_with_empty_agent_list_is_rejected() {
    let ctx = setup().await;
    let request = SignalRequest::sync(json!({ "scope": "specific", "agents": [] }));
    assert_eq!(ctx.engine.submit(request).await.unwrap_err(), ValidationError::EmptyScope);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sync_cancels_in_flight_run_at_step_boundary() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_millis(100));
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config()).await;
    ctx.add_agent(passthrough_agent("agt-a", 3)).await;

    let mut run = ctx.run("agt-a", json!({})).await;
    let sandbox = ctx.sandbox.clone();
    eventually("first step to start", || !sandbox.calls().is_empty()).await;

    let sync = ctx
        .engine
        .submit(SignalRequest::sync(json!({})).with_agent("agt-a"))
        .await
        .unwrap()
        .signal();
    assert_eq!(sync.status, SignalStatus::Complete);

    let cancelled = finished(&mut run).await;
    assert_eq!(cancelled.status, SignalStatus::Error);
    assert_eq!(cancelled.error.as_deref(), Some(CANCELLED_BY_SYNC));
    let session = ctx.session_of(&cancelled).await;
    assert_eq!(session.status, SessionStatus::Cancelled);
    assert!(ctx.sandbox.calls().len() < 3);

    // The agent keeps accepting work after the sync.
    let next = ctx.run_to_end("agt-a", json!({ "after": true })).await;
    assert_eq!(next.status, SignalStatus::Complete);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sync_keeps_agent_created_while_draining() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_millis(300));
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config()).await;
    ctx.add_agent(passthrough_agent("agt-b", 1)).await;

    let mut busy = ctx.run("agt-b", json!({})).await;
    let sandbox = ctx.sandbox.clone();
    eventually("agt-b step to start", || !sandbox.calls().is_empty()).await;

    let request = SignalRequest::sync(json!({ "scope": "specific", "agents": ["agt-a", "agt-b"] }));
    let (sync, mut late) = tokio::join!(
        async { ctx.engine.submit(request).await.unwrap().signal() },
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ctx.add_agent(passthrough_agent("agt-a", 1)).await;
            ctx.run("agt-a", json!({ "late": true })).await
        },
    );

    assert_eq!(sync.status, SignalStatus::Complete);
    assert!(sync.response.unwrap().get("agt-a").is_some());

    let late = finished(&mut late).await;
    assert_eq!(late.status, SignalStatus::Complete, "{:?}", late.error);
    assert_eq!(late.response, Some(json!({ "late": true })));
    finished(&mut busy).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sync_fails_queued_runs_of_agent_gone_from_store() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_millis(200));
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config()).await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    let mut first = ctx.run("agt-a", json!({ "n": 1 })).await;
    let mut queued = ctx.run("agt-a", json!({ "n": 2 })).await;
    let sandbox = ctx.sandbox.clone();
    eventually("first run to start", || !sandbox.calls().is_empty()).await;
    assert!(ctx.store.delete_agent(&AgentId::from("agt-a")).await.unwrap());

    let sync = ctx
        .engine
        .submit(SignalRequest::sync(json!({})).with_agent("agt-a"))
        .await
        .unwrap()
        .signal();

    assert_eq!(sync.status, SignalStatus::Complete);
    assert_eq!(sync.response, Some(json!({})));
    finished(&mut first).await;
    let dropped = finished(&mut queued).await;
    assert_eq!(dropped.status, SignalStatus::Error);
    assert_eq!(dropped.error.as_deref(), Some(AGENT_DELETED));
    assert!(dropped.session_id.is_none());
}

#[tokio::test]
async fn handle_tracks_status_through_processing() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    let mut handle = ctx.run("agt-a", json!({})).await;
    assert_ne!(handle.signal().status, SignalStatus::Error);

    let done = finished(&mut handle).await;
    assert_eq!(done.status, SignalStatus::Complete);
    assert!(done.session_id.is_some());
    assert_eq!(ctx.engine.get_signal(done.id).await.unwrap(), Some(done));
}
