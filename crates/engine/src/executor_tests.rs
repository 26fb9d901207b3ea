// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use portico_adapters::{FakeModel, FakeSandbox, SandboxError};
use portico_core::FakeClock;
use serde_json::json;

struct Harness {
    executor: StepExecutor<FakeSandbox, FakeModel, FakeClock>,
    model: FakeModel,
    sandbox: FakeSandbox,
    clock: FakeClock,
}

fn harness(sandbox: FakeSandbox, model: FakeModel) -> Harness {
    let clock = FakeClock::new();
    let config = EngineConfig::default().default_model("test-model");
    let executor = StepExecutor::new(sandbox.clone(), model.clone(), clock.clone(), &config);
    Harness { executor, model, sandbox, clock }
}

fn prompt_step(template: &str) -> Step {
    Step::builder().kind(StepKind::prompt(template)).build()
}

#[tokio::test]
async fn code_step_returns_sandbox_result() {
    let h = harness(FakeSandbox::with_handler(|_, input| Ok(json!({"wrapped": input}))), FakeModel::new());
    let step = Step::builder().kind(StepKind::code("result = {'wrapped': source}")).build();

    let outcome = h.executor.execute(&step, &json!([1])).await;

    assert_eq!(outcome.result.unwrap(), json!({"wrapped": [1]}));
    assert_eq!(outcome.attempts, 1);
    assert_eq!(h.sandbox.calls()[0].code, "result = {'wrapped': source}");
}

#[tokio::test]
async fn code_step_failure_is_not_retried() {
    let h = harness(
        FakeSandbox::with_handler(|_, _| Err(SandboxError::Runtime("NameError: x".into()))),
        FakeModel::new(),
    );
    let step = Step::builder().build();

    let outcome = h.executor.execute(&step, &json!({})).await;

    assert_eq!(
        outcome.result.unwrap_err(),
        ExecutionError::Code(SandboxError::Runtime("NameError: x".into()))
    );
    assert_eq!(h.sandbox.calls().len(), 1);
}

#[tokio::test]
async fn prompt_renders_template_and_uses_default_model() {
    let h = harness(FakeSandbox::new(), FakeModel::scripted([Ok("plain words".to_string())]));

    let outcome = h.executor.execute(&prompt_step("Summarize {{topic}}"), &json!({"topic": "rust"})).await;

    assert_eq!(outcome.result.unwrap(), json!("plain words"));
    let calls = h.model.calls();
    assert_eq!(calls[0].text, "Summarize rust");
    assert_eq!(calls[0].model, "test-model");
}

#[tokio::test]
async fn prompt_step_model_overrides_default() {
    let h = harness(FakeSandbox::new(), FakeModel::new());
    let step = Step::builder()
        .kind(StepKind::Prompt { template: "hi".into(), model: Some("other".into()) })
        .build();

    h.executor.execute(&step, &json!({})).await.result.unwrap();

    assert_eq!(h.model.calls()[0].model, "other");
}

#[tokio::test]
async fn json_reply_becomes_structured_output() {
    let h = harness(FakeSandbox::new(), FakeModel::scripted([Ok(r#" {"score": 3} "#.to_string())]));

    let outcome = h.executor.execute(&prompt_step("rate it"), &json!({})).await;

    assert_eq!(outcome.result.unwrap(), json!({"score": 3}));
}

#[tokio::test]
async fn transient_twice_then_success_makes_three_attempts() {
    let h = harness(
        FakeSandbox::new(),
        FakeModel::scripted([
            Err(ModelError::Transient("429".into())),
            Err(ModelError::Transient("503".into())),
            Ok("ok".to_string()),
        ]),
    );

    let outcome = h.executor.execute(&prompt_step("go"), &json!({})).await;

    assert_eq!(outcome.result.unwrap(), json!("ok"));
    assert_eq!(outcome.attempts, 3);
    assert_eq!(h.model.attempts(), 3);
    assert_eq!(h.clock.sleeps().len(), 2);
}

#[tokio::test]
async fn permanent_failure_makes_one_attempt() {
    let h = harness(FakeSandbox::new(), FakeModel::scripted([Err(ModelError::Permanent("401".into()))]));

    let outcome = h.executor.execute(&prompt_step("go"), &json!({})).await;

    assert_eq!(
        outcome.result.unwrap_err(),
        ExecutionError::Model { attempts: 1, source: ModelError::Permanent("401".into()) }
    );
    assert_eq!(h.model.attempts(), 1);
    assert!(h.clock.sleeps().is_empty());
}

#[tokio::test]
async fn transient_exhaustion_reports_attempts() {
    let h = harness(
        FakeSandbox::new(),
        FakeModel::scripted((0..5).map(|_| Err(ModelError::Transient("busy".into())))),
    );

    let outcome = h.executor.execute(&prompt_step("go"), &json!({})).await;

    assert!(matches!(outcome.result, Err(ExecutionError::Model { attempts: 3, .. })));
    assert_eq!(h.model.attempts(), 3);
}

#[tokio::test]
async fn missing_template_variable_never_calls_model() {
    let h = harness(FakeSandbox::new(), FakeModel::new());

    let outcome = h.executor.execute(&prompt_step("Hi {{name}}"), &json!({})).await;

    assert!(matches!(outcome.result, Err(ExecutionError::Template(_))));
    assert_eq!(outcome.attempts, 0);
    assert_eq!(h.model.attempts(), 0);
}

#[tokio::test]
async fn elapsed_includes_backoff() {
    let h = harness(
        FakeSandbox::new(),
        FakeModel::scripted([Err(ModelError::Transient("busy".into())), Ok("1".into())]),
    );

    let outcome = h.executor.execute(&prompt_step("go"), &json!({})).await;

    let slept: f64 = h.clock.sleeps().iter().map(|d| d.as_secs_f64()).sum();
    assert!((outcome.elapsed - slept).abs() < 1e-9);
}

#[yare::parameterized(
    object  = { r#"{"a":1}"#, json!({"a": 1}) },
    number  = { "42",         json!(42) },
    text    = { "hello",      json!("hello") },
    broken  = { "{oops",      json!("{oops") },
)]
fn replies_parse_when_json(reply: &str, expected: Value) {
    assert_eq!(parse_reply(reply.to_string()), expected);
}
