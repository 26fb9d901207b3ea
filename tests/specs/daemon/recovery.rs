// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart specs
//!
//! Verify the journal carries agents and signals across restarts.

use crate::prelude::*;

#[test]
fn agents_and_signals_survive_graceful_restart() {
    let daemon = Daemon::start();
    let created = daemon.call(daemon.client().create_agent(empty_agent("agt-echo"))).unwrap();
    assert!(created.success, "{}", created.message);
    let done = daemon.run_to_end(Request::submit("run", Some("agt-echo"), json!({ "n": 1 })));
    assert_eq!(done.status, SignalStatus::Complete);

    let (_, state) = daemon.stop();
    let daemon = Daemon::start_in(state);

    let agents = daemon.call(daemon.client().list_agents()).unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].id, "agt-echo");
    let again = daemon.call(daemon.client().get_signal(done.id)).unwrap();
    assert_eq!(again, done);
}

#[test]
fn signal_ids_keep_increasing_after_crash() {
    let daemon = Daemon::start();
    let first = daemon.call(daemon.client().submit(Request::submit("fyi", None, json!({})))).unwrap();

    let state = daemon.kill();
    let daemon = Daemon::start_in(state);

    let next = daemon.call(daemon.client().submit(Request::submit("fyi", None, json!({})))).unwrap();
    assert!(next.id > first.id, "{} should follow {}", next.id, first.id);
}
