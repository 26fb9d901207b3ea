// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    code   = { StepKind::code("result = 1"),        "code" },
    prompt = { StepKind::prompt("hi {{name}}"),     "prompt" },
)]
fn kind_display(kind: StepKind, expected: &str) {
    assert_eq!(kind.to_string(), expected);
}

#[test]
fn kind_content_returns_source_or_template() {
    assert_eq!(StepKind::code("x = 1").content(), "x = 1");
    assert_eq!(StepKind::prompt("Say {{word}}").content(), "Say {{word}}");
}

#[test]
fn step_serializes_kind_inline() {
    let step = Step::builder()
        .id("stp-1")
        .agent_id("agt-1")
        .position(2)
        .kind(StepKind::Prompt { template: "t".into(), model: Some("m".into()) })
        .build();

    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(value["kind"], "prompt");
    assert_eq!(value["template"], "t");
    assert_eq!(value["model"], "m");
    assert_eq!(value["position"], 2);
}

#[test]
fn step_deserializes_with_default_counters() {
    let step: Step = serde_json::from_value(json!({
        "id": "stp-9",
        "agent_id": "agt-9",
        "position": 0,
        "kind": "code",
        "source": "result = source"
    }))
    .unwrap();

    assert_eq!(step.kind, StepKind::code("result = source"));
    assert_eq!(step.run_count, 0);
    assert_eq!(step.success_count, 0);
    assert!(step.description.is_none());
}

#[test]
fn unknown_kind_is_rejected() {
    let result: Result<Step, _> = serde_json::from_value(json!({
        "id": "stp-9",
        "agent_id": "agt-9",
        "position": 0,
        "kind": "webscrape",
        "source": "https://example.com"
    }));
    assert!(result.is_err());
}

#[test]
fn record_run_counts_successes_separately() {
    let mut step = Step::new(AgentId::from("agt-1"), 0, StepKind::code("result = 1"));
    step.record_run(true);
    step.record_run(false);
    step.record_run(true);
    assert_eq!(step.run_count, 3);
    assert_eq!(step.success_count, 2);
}
