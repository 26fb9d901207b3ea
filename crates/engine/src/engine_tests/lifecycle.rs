// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start-up recovery, shutdown draining, fatal scheduler errors.

use super::*;
use portico_core::test_support::run_signal;
use portico_core::{SessionStatus, SignalId, SignalStatus};
use portico_storage::Store;

#[tokio::test]
async fn start_requeues_pending_runs_and_abandons_interrupted_ones() {
    let store = MemoryStore::new();
    store.save_agent(&passthrough_agent("agt-a", 1)).await.unwrap();
    store.save_signal(&run_signal(5, "agt-a", json!({ "queued": true }))).await.unwrap();

    let mut interrupted = run_signal(6, "agt-a", json!({}));
    let mut session = RuntimeSession::new(interrupted.id, AgentId::from("agt-a"), json!({}), 1);
    session.begin(2);
    interrupted.begin_processing(Some(session.id.clone()), 2).unwrap();
    store.save_session(&session).await.unwrap();
    store.save_signal(&interrupted).await.unwrap();

    let ctx = setup_with(store, FakeSandbox::new(), FakeModel::new(), test_config()).await;

    let sandbox = ctx.sandbox.clone();
    eventually("queued run to execute", || sandbox.calls().len() == 1).await;
    let store = ctx.store.clone();
    let requeued = loop {
        let signal = store.get_signal(SignalId(5)).await.unwrap().unwrap();
        if signal.is_terminal() {
            break signal;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(requeued.status, SignalStatus::Complete);
    assert_eq!(requeued.response, Some(json!({ "queued": true })));

    let abandoned = ctx.engine.get_signal(SignalId(6)).await.unwrap().unwrap();
    assert_eq!(abandoned.status, SignalStatus::Error);
    assert_eq!(abandoned.error.as_deref(), Some(INTERRUPTED));
    let abandoned_session = ctx.engine.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(abandoned_session.status, SessionStatus::Cancelled);

    let next = ctx.engine.submit(SignalRequest::fyi(json!(null))).await.unwrap();
    assert_eq!(next.id(), SignalId(7));
}

#[tokio::test]
async fn shutdown_refuses_new_signals() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    ctx.engine.shutdown().await.unwrap();

    assert!(ctx.engine.is_stopping());
    let err = ctx.engine.submit(SignalRequest::run("agt-a", json!({}))).await.unwrap_err();
    assert_eq!(err, ValidationError::ShuttingDown);
    // Second shutdown is a no-op.
    ctx.engine.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_finishes_in_flight_run_and_leaves_queue_pending() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_millis(100));
    let ctx =
        setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config().workers(1)).await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    let mut first = ctx.run("agt-a", json!({ "n": 1 })).await;
    let second = ctx.run("agt-a", json!({ "n": 2 })).await;
    let sandbox = ctx.sandbox.clone();
    eventually("first run to start", || !sandbox.calls().is_empty()).await;

    ctx.engine.shutdown().await.unwrap();

    assert_eq!(finished(&mut first).await.status, SignalStatus::Complete);
    let stored = ctx.engine.get_signal(second.id()).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Pending);
    assert_eq!(ctx.sandbox.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_gives_up_after_drain_timeout() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_secs(5));
    let config = test_config().drain_timeout(Duration::from_millis(50));
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), config).await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    ctx.run("agt-a", json!({})).await;
    let sandbox = ctx.sandbox.clone();
    eventually("run to start", || !sandbox.calls().is_empty()).await;

    let err = ctx.engine.shutdown().await.unwrap_err();
    assert!(matches!(err, EngineError::DrainTimeout(d) if d == Duration::from_millis(50)));
}

#[tokio::test]
async fn invariant_violation_stops_the_engine() {
    let ctx = setup().await;
    let violation = SchedulerInvariantViolation::UnexpectedDone {
        agent: AgentId::from("agt-a"),
        finished: SignalId(3),
        in_flight: None,
    };

    ctx.engine.shared().fail(violation.clone());

    let err = ctx.engine.wait().await.unwrap_err();
    assert!(matches!(err, EngineError::Invariant(v) if v == violation));
    let err = ctx.engine.submit(SignalRequest::fyi(json!(null))).await.unwrap_err();
    assert_eq!(err, ValidationError::ShuttingDown);
    assert!(ctx.engine.shutdown().await.is_err());
}

#[tokio::test]
async fn create_agent_makes_it_runnable() {
    let ctx = setup().await;

    let response = ctx.engine.create_agent(passthrough_agent("agt-a", 2)).await;
    assert!(response.success);
    assert_eq!(response.message, "agent agt-a created with 2 step(s)");

    let agents = ctx.engine.list_agents().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].created_at_ms, ctx.clock.epoch_ms());
    assert_eq!(ctx.run_to_end("agt-a", json!({})).await.status, SignalStatus::Complete);
}

#[tokio::test]
async fn create_agent_rejects_gapped_step_positions() {
    let ctx = setup().await;
    let mut agent = passthrough_agent("agt-a", 3);
    agent.steps[2].position = 7;

    let response = ctx.engine.create_agent(agent).await;

    assert!(!response.success);
    assert!(response.message.contains("positions 0..3"), "{}", response.message);
    assert!(ctx.engine.list_agents().await.unwrap().is_empty());
}

#[tokio::test]
async fn recreating_an_agent_updates_it_in_place() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    let created = ctx.engine.get_agent(&AgentId::from("agt-a")).await.unwrap().unwrap();
    ctx.clock.advance(Duration::from_secs(1));

    let response = ctx.engine.create_agent(passthrough_agent("agt-a", 3)).await;

    assert_eq!(response.message, "agent agt-a updated with 3 step(s)");
    let updated = ctx.engine.get_agent(&AgentId::from("agt-a")).await.unwrap().unwrap();
    assert_eq!(updated.steps.len(), 3);
    assert_eq!(updated.created_at_ms, created.created_at_ms);
    assert!(updated.updated_at_ms > created.updated_at_ms);
}

#[tokio::test]
async fn stop_then_start_toggles_acceptance() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    let id = AgentId::from("agt-a");

    assert!(ctx.engine.stop_agent(&id).await.success);
    assert_eq!(ctx.run("agt-a", json!({})).await.signal().status, SignalStatus::Error);

    assert!(ctx.engine.start_agent(&id).await.success);
    assert_eq!(ctx.run_to_end("agt-a", json!({})).await.status, SignalStatus::Complete);

    let again = ctx.engine.start_agent(&id).await;
    assert!(!again.success);
    assert!(again.message.contains("cannot start"), "{}", again.message);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delete_agent_fails_its_queued_signals() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_millis(100));
    let ctx =
        setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config().workers(1)).await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    let mut running = ctx.run("agt-a", json!({ "n": 1 })).await;
    let mut queued = vec![
        ctx.run("agt-a", json!({ "n": 2 })).await,
        ctx.run("agt-a", json!({ "n": 3 })).await,
    ];
    let sandbox = ctx.sandbox.clone();
    eventually("first run to start", || !sandbox.calls().is_empty()).await;

    let response = ctx.engine.delete_agent(&AgentId::from("agt-a")).await;
    assert!(response.success);
    assert_eq!(response.message, "agent agt-a deleted, 2 queued signal(s) failed");

    for handle in &mut queued {
        let signal = finished(handle).await;
        assert_eq!(signal.error.as_deref(), Some(AGENT_DELETED));
    }
    assert_eq!(finished(&mut running).await.status, SignalStatus::Complete);
    assert!(ctx.engine.get_agent(&AgentId::from("agt-a")).await.unwrap().is_none());
    assert_eq!(ctx.engine.pending(), 0);
}

#[tokio::test]
async fn delete_unknown_agent_fails() {
    let ctx = setup().await;
    let response = ctx.engine.delete_agent(&AgentId::from("agt-x")).await;
    assert_eq!(response, CommandResponse::failed("agent agt-x not found"));
}
