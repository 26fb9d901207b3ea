// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal submission specs
//!
//! Verify run, sync, and fyi routing without executing any code steps.

use crate::prelude::*;

#[test]
fn zero_step_run_completes_with_its_payload() {
    let daemon = Daemon::start();
    daemon.call(daemon.client().create_agent(empty_agent("agt-empty"))).unwrap();

    let payload = json!({ "order": 7, "items": ["a", "b"] });
    let signal = daemon.run_to_end(Request::submit("run", Some("agt-empty"), payload.clone()));

    assert_eq!(signal.status, SignalStatus::Complete);
    assert_eq!(signal.response, Some(payload));
    let session_id = signal.session_id.unwrap();
    let session = daemon.call(daemon.client().get_session(&session_id)).unwrap().unwrap();
    assert_eq!(session.latest_step_idx, None);
}

#[test]
fn run_for_unknown_agent_ends_in_error() {
    let daemon = Daemon::start();

    let signal = daemon
        .call(daemon.client().submit(Request::submit("run", Some("agt-ghost"), json!({}))))
        .unwrap();

    assert_eq!(signal.status, SignalStatus::Error);
    assert_eq!(signal.error.as_deref(), Some("agent agt-ghost not found"));
}

#[test]
fn fyi_is_recorded_without_a_session() {
    let daemon = Daemon::start();

    let signal = daemon
        .call(daemon.client().submit(Request::submit("fyi", None, json!({ "note": "hello" }))))
        .unwrap();

    assert_eq!(signal.status, SignalStatus::Complete);
    assert!(signal.session_id.is_none());
}

#[test]
fn sync_returns_definitions_map() {
    let daemon = Daemon::start();
    daemon.call(daemon.client().create_agent(empty_agent("agt-a"))).unwrap();
    daemon.call(daemon.client().create_agent(empty_agent("agt-b"))).unwrap();

    let request = Request::submit("sync", None, json!({ "scope": "specific", "agents": ["agt-b"] }));
    let signal = daemon.call(daemon.client().submit(request)).unwrap();

    assert_eq!(signal.status, SignalStatus::Complete);
    let response = signal.response.unwrap();
    assert!(response.get("agt-a").is_none());
    assert_eq!(response["agt-b"]["id"], "agt-b");
}

#[test]
fn duplicate_correlation_id_returns_the_original_signal() {
    let daemon = Daemon::start();
    daemon.call(daemon.client().create_agent(empty_agent("agt-a"))).unwrap();
    let request = Request::Submit {
        kind: "run".to_string(),
        agent_id: Some(AgentId::from("agt-a")),
        payload: json!({ "n": 1 }),
        correlation_id: Some("order-7".to_string()),
    };

    let first = daemon.run_to_end(request.clone());
    let second = daemon.call(daemon.client().submit(request)).unwrap();

    assert_eq!(second.id, first.id);
}

#[test]
fn invalid_submissions_are_rejected() {
    let daemon = Daemon::start();

    for (request, message) in [
        (Request::submit("webhook", None, json!({})), "unknown signal kind: webhook"),
        (Request::submit("run", None, json!({})), "run signals require a target agent"),
        (
            Request::submit("sync", None, json!({ "scope": "specific", "agents": [] })),
            "sync scope lists no agents",
        ),
    ] {
        let err = daemon.call(daemon.client().submit(request)).unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m == message), "{err}");
    }
}
