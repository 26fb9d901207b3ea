// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent serial execution, cross-agent parallelism, output threading.

use super::*;
use portico_adapters::{ModelError, SandboxError};
use portico_core::{SessionStatus, SignalStatus};
use yare::parameterized;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_agent_runs_one_signal_at_a_time_in_submit_order() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_millis(20));
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config()).await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;

    let mut handles = Vec::new();
    for n in 0..5 {
        handles.push(ctx.run("agt-a", json!({ "n": n })).await);
    }
    for handle in &mut handles {
        assert_eq!(finished(handle).await.status, SignalStatus::Complete);
    }

    assert_eq!(ctx.sandbox.max_concurrent(), 1);
    let order: Vec<_> = ctx.sandbox.calls().into_iter().map(|c| c.input["n"].clone()).collect();
    assert_eq!(order, (0..5).map(|n| json!(n)).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_agents_run_in_parallel() {
    let sandbox = FakeSandbox::new().with_delay(Duration::from_millis(100));
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config()).await;
    ctx.add_agent(passthrough_agent("agt-a", 1)).await;
    ctx.add_agent(passthrough_agent("agt-b", 1)).await;

    let mut a = ctx.run("agt-a", json!({})).await;
    let mut b = ctx.run("agt-b", json!({})).await;
    finished(&mut a).await;
    finished(&mut b).await;

    assert_eq!(ctx.sandbox.max_concurrent(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queued_signals_of_a_busy_agent_do_not_block_others() {
    let sandbox = FakeSandbox::with_handler(|code, input| {
        if code == "slow" {
            std::thread::sleep(Duration::from_millis(50));
        }
        Ok(input.clone())
    });
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config()).await;
    ctx.add_agent(agent_with("agt-slow", [StepKind::code("slow")])).await;
    ctx.add_agent(passthrough_agent("agt-fast", 1)).await;

    for _ in 0..6 {
        ctx.run("agt-slow", json!({})).await;
    }
    let fast = ctx.run_to_end("agt-fast", json!({ "fast": true })).await;

    assert_eq!(fast.status, SignalStatus::Complete);
    assert!(ctx.engine.pending() > 0, "slow agent should still have queued work");
}

#[tokio::test]
async fn run_with_n_steps_reports_last_index() {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 4)).await;

    let signal = ctx.run_to_end("agt-a", json!({ "x": 1 })).await;
    let session = ctx.session_of(&signal).await;

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.latest_step_idx, Some(3));
    assert_eq!(session.step_times.len(), 4);
    assert_eq!(session.output, Some(json!({ "x": 1 })));
    assert_eq!(signal.response, Some(json!({ "x": 1 })));
}

#[parameterized(
    first = { 0 },
    middle = { 2 },
    last = { 4 },
)]
#[test_macro(tokio::test)]
async fn failure_at_step_k_stops_the_run(k: usize) {
    let sandbox = FakeSandbox::with_handler(|code, input| match code {
        "fail" => Err(SandboxError::Runtime("ValueError: bad input".into())),
        _ => Ok(input.clone()),
    });
    let ctx = setup_with(MemoryStore::new(), sandbox, FakeModel::new(), test_config()).await;
    let kinds = (0..5).map(|i| StepKind::code(if i == k { "fail" } else { "ok" }));
    ctx.add_agent(agent_with("agt-a", kinds)).await;

    let signal = ctx.run_to_end("agt-a", json!({})).await;
    let session = ctx.session_of(&signal).await;

    assert_eq!(signal.status, SignalStatus::Error);
    assert!(signal.error.unwrap().contains(&format!("step {k}")));
    assert_eq!(session.latest_step_idx, Some(k));
    assert_eq!(session.step_outputs.len(), k);
    assert_eq!(session.failure.as_ref().map(|f| f.position), Some(k));
    assert_eq!(ctx.sandbox.calls().len(), k + 1);
}

#[parameterized(
    empty_object = { json!({}) },
    nested = { json!({ "a": { "b": [1, { "c": null }] } }) },
    array = { json!([1, "two", 3.5]) },
    scalar = { json!("just text") },
)]
#[test_macro(tokio::test)]
async fn payload_threads_unchanged_through_passthrough_steps(payload: Value) {
    let ctx = setup().await;
    ctx.add_agent(passthrough_agent("agt-a", 3)).await;

    let signal = ctx.run_to_end("agt-a", payload.clone()).await;

    assert_eq!(signal.response, Some(payload.clone()));
    let inputs: Vec<_> = ctx.sandbox.calls().into_iter().map(|c| c.input).collect();
    assert_eq!(inputs, vec![payload.clone(), payload.clone(), payload]);
}

#[tokio::test]
async fn prompt_output_feeds_the_next_step() {
    let model = FakeModel::scripted([Ok(r#"{"summary": "short"}"#.to_string())]);
    let ctx = setup_with(MemoryStore::new(), FakeSandbox::new(), model, test_config()).await;
    ctx.add_agent(agent_with(
        "agt-a",
        [StepKind::prompt("Summarize {{text}}"), StepKind::code("result = source")],
    ))
    .await;

    let signal = ctx.run_to_end("agt-a", json!({ "text": "a long story" })).await;

    assert_eq!(ctx.model.calls()[0].text, "Summarize a long story");
    assert_eq!(ctx.sandbox.calls()[0].input, json!({ "summary": "short" }));
    assert_eq!(signal.response, Some(json!({ "summary": "short" })));
}

#[parameterized(
    transient_is_retried = { ModelError::Transient("HTTP 503: busy".into()), 3 },
    permanent_is_not = { ModelError::Permanent("HTTP 401: bad key".into()), 1 },
)]
#[test_macro(tokio::test)]
async fn prompt_failures_retry_by_class(error: ModelError, attempts: usize) {
    let model = FakeModel::scripted(std::iter::repeat(Err(error)).take(5));
    let ctx = setup_with(MemoryStore::new(), FakeSandbox::new(), model, test_config()).await;
    ctx.add_agent(agent_with("agt-a", [StepKind::prompt("hi")])).await;

    let signal = ctx.run_to_end("agt-a", json!({})).await;

    assert_eq!(signal.status, SignalStatus::Error);
    assert_eq!(ctx.model.attempts(), attempts);
    assert_eq!(ctx.clock.sleeps().len(), attempts - 1);
}
