// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn ids(names: &[&str]) -> Vec<AgentId> {
    names.iter().map(|n| AgentId::from(*n)).collect()
}

#[parameterized(
    explicit_all = { None, json!({ "scope": "all" }), SyncScope::All },
    untargeted_default = { None, json!({}), SyncScope::All },
    null_payload = { None, json!(null), SyncScope::All },
    targeted_default = { Some("agt-a"), json!({}), SyncScope::Specific(ids(&["agt-a"])) },
    explicit_list = {
        None,
        json!({ "scope": "specific", "agents": ["agt-a", "agt-b"] }),
        SyncScope::Specific(ids(&["agt-a", "agt-b"]))
    },
    specific_falls_back_to_target = {
        Some("agt-c"),
        json!({ "scope": "specific" }),
        SyncScope::Specific(ids(&["agt-c"]))
    },
)]
fn scope_parses(agent: Option<&str>, payload: Value, expected: SyncScope) {
    let agent = agent.map(AgentId::from);
    assert_eq!(SyncScope::from_request(agent.as_ref(), &payload).unwrap(), expected);
}

#[parameterized(
    empty_list = { json!({ "scope": "specific", "agents": [] }), ValidationError::EmptyScope },
    specific_without_target = { json!({ "scope": "specific" }), ValidationError::EmptyScope },
    unknown_scope = { json!({ "scope": "some" }), ValidationError::InvalidScope("some".into()) },
    scope_not_a_string = { json!({ "scope": 3 }), ValidationError::InvalidScope("3".into()) },
)]
fn scope_rejects(payload: Value, expected: ValidationError) {
    assert_eq!(SyncScope::from_request(None, &payload).unwrap_err(), expected);
}

#[test]
fn scope_rejects_non_string_agent_ids() {
    let payload = json!({ "scope": "specific", "agents": ["agt-a", 7] });
    assert!(matches!(
        SyncScope::from_request(None, &payload),
        Err(ValidationError::InvalidScope(msg)) if msg.contains("non-empty strings")
    ));
}

#[parameterized(
    run = { "run", SignalKind::Run },
    command_alias = { "command", SignalKind::Run },
    sync = { "sync", SignalKind::Sync },
    fyi = { "fyi", SignalKind::Fyi },
)]
fn kind_parses(name: &str, expected: SignalKind) {
    assert_eq!(SignalRequest::parse_kind(name).unwrap(), expected);
}

#[test]
fn unknown_kind_is_a_validation_error() {
    assert_eq!(
        SignalRequest::parse_kind("explode").unwrap_err(),
        ValidationError::UnknownKind("explode".into())
    );
}

#[test]
fn request_deserializes_with_defaults() {
    let request: SignalRequest =
        serde_json::from_value(json!({ "kind": "command", "agent_id": "agt-a" })).unwrap();
    assert_eq!(request, SignalRequest::run("agt-a", Value::Null));
}
