// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn agent_in(state: AgentState) -> Agent {
    Agent::builder().state(state).build()
}

#[test]
fn new_agents_start_inactive() {
    let agent = Agent::new(AgentId::from("agt-1"), "desc");
    assert_eq!(agent.state, AgentState::Inactive);
    assert!(!agent.accepts_runs());
}

#[yare::parameterized(
    inactive = { AgentState::Inactive, false },
    stable   = { AgentState::Stable,   true },
    unstable = { AgentState::Unstable, true },
)]
fn accepts_runs_by_state(state: AgentState, expected: bool) {
    assert_eq!(state.accepts_runs(), expected);
}

#[yare::parameterized(
    start_from_inactive      = { AgentState::Inactive, "start",    Some(AgentState::Stable) },
    start_from_stable        = { AgentState::Stable,   "start",    None },
    stop_from_stable         = { AgentState::Stable,   "stop",     Some(AgentState::Inactive) },
    stop_from_unstable       = { AgentState::Unstable, "stop",     Some(AgentState::Inactive) },
    stop_from_inactive       = { AgentState::Inactive, "stop",     None },
    unstable_from_stable     = { AgentState::Stable,   "unstable", Some(AgentState::Unstable) },
    unstable_from_inactive   = { AgentState::Inactive, "unstable", None },
    stable_from_unstable     = { AgentState::Unstable, "stable",   Some(AgentState::Stable) },
    stable_from_stable       = { AgentState::Stable,   "stable",   None },
)]
fn lifecycle_transitions(from: AgentState, action: &str, expected: Option<AgentState>) {
    let mut agent = agent_in(from);
    let result = match action {
        "start" => agent.start(),
        "stop" => agent.stop(),
        "unstable" => agent.mark_unstable(),
        _ => agent.mark_stable(),
    };
    match expected {
        Some(state) => {
            assert!(result.is_ok());
            assert_eq!(agent.state, state);
        }
        None => {
            assert!(matches!(result, Err(AgentError::InvalidTransition { .. })));
            assert_eq!(agent.state, from);
        }
    }
}

#[test]
fn state_parses_case_insensitively() {
    assert_eq!("Stable".parse::<AgentState>().unwrap(), AgentState::Stable);
    assert_eq!("INACTIVE".parse::<AgentState>().unwrap(), AgentState::Inactive);
    assert!("running".parse::<AgentState>().is_err());
}

#[test]
fn push_step_assigns_next_position() {
    let mut agent = Agent::new(AgentId::from("agt-1"), "");
    agent.push_step(StepKind::code("result = 1"));
    let second = agent.push_step(StepKind::prompt("{{x}}")).clone();
    assert_eq!(second.position, 1);
    assert_eq!(second.agent_id, "agt-1");
    assert!(agent.validate().is_ok());
}

#[test]
fn validate_sorts_steps_by_position() {
    let mut agent = Agent::builder()
        .step_kinds([StepKind::code("a"), StepKind::code("b"), StepKind::code("c")])
        .build();
    agent.steps.reverse();
    agent.validate().unwrap();
    let positions: Vec<_> = agent.steps.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert_eq!(agent.steps[0].kind, StepKind::code("a"));
}

#[test]
fn validate_rejects_gaps() {
    let mut agent = Agent::builder().step_kinds([StepKind::code("a"), StepKind::code("b")]).build();
    agent.steps[1].position = 5;
    assert!(matches!(agent.validate(), Err(AgentError::StepOrder { len: 2, .. })));
}

#[test]
fn validate_rejects_duplicate_positions() {
    let mut agent = Agent::builder().step_kinds([StepKind::code("a"), StepKind::code("b")]).build();
    agent.steps[1].position = 0;
    assert!(matches!(agent.validate(), Err(AgentError::StepOrder { .. })));
}

#[test]
fn validate_rejects_steps_owned_by_another_agent() {
    let mut agent = Agent::builder().step_kinds([StepKind::code("a")]).build();
    agent.steps[0].agent_id = AgentId::from("agt-other");
    assert!(matches!(agent.validate(), Err(AgentError::ForeignStep { .. })));
}

#[test]
fn validate_rejects_blank_id() {
    let mut agent = Agent::builder().id("").build();
    assert_eq!(agent.validate(), Err(AgentError::MissingId));
}

#[test]
fn deserializes_minimal_definition() {
    let agent: Agent = serde_json::from_value(json!({
        "id": "agt-min",
        "steps": [
            { "id": "stp-a", "agent_id": "agt-min", "position": 0, "kind": "code", "source": "result = source" }
        ]
    }))
    .unwrap();

    assert_eq!(agent.state, AgentState::Inactive);
    assert_eq!(agent.steps.len(), 1);
    assert!((agent.failure_threshold - 0.2).abs() < f64::EPSILON);
}
