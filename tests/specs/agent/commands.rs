// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent command specs
//!
//! Verify create, stop, start, and delete over the socket.

use crate::prelude::*;

#[test]
fn create_reports_step_count() {
    let daemon = Daemon::start();

    let response = daemon
        .call(daemon.client().create_agent(agent("agt-a", [StepKind::code("result = source")])))
        .unwrap();

    assert!(response.success);
    assert_eq!(response.message, "agent agt-a created with 1 step(s)");
}

#[test]
fn stopped_agent_rejects_runs_until_started() {
    let daemon = Daemon::start();
    daemon.call(daemon.client().create_agent(empty_agent("agt-a"))).unwrap();

    assert!(daemon.call(daemon.client().stop_agent("agt-a")).unwrap().success);
    let rejected = daemon.run_to_end(Request::submit("run", Some("agt-a"), json!({})));
    assert_eq!(rejected.status, SignalStatus::Error);
    assert_eq!(rejected.error.as_deref(), Some("agent agt-a is inactive"));

    assert!(daemon.call(daemon.client().start_agent("agt-a")).unwrap().success);
    let accepted = daemon.run_to_end(Request::submit("run", Some("agt-a"), json!({})));
    assert_eq!(accepted.status, SignalStatus::Complete);
}

#[test]
fn delete_removes_the_agent() {
    let daemon = Daemon::start();
    daemon.call(daemon.client().create_agent(empty_agent("agt-a"))).unwrap();

    let deleted = daemon.call(daemon.client().delete_agent("agt-a")).unwrap();
    assert_eq!(deleted.message, "agent agt-a deleted");
    assert!(daemon.call(daemon.client().list_agents()).unwrap().is_empty());

    let again = daemon.call(daemon.client().delete_agent("agt-a")).unwrap();
    assert!(!again.success);
    assert_eq!(again.message, "agent agt-a not found");
}
