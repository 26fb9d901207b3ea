// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code step specs
//!
//! Run real Python steps. Skipped when `python3` is not installed.

use crate::prelude::*;

#[test]
fn code_steps_thread_output_in_order() {
    if !has_python() {
        return;
    }
    let daemon = Daemon::start();
    let steps = [
        StepKind::code("result = {'n': source['n'] + 1}"),
        StepKind::code("result = {'n': source['n'] * 10}"),
    ];
    daemon.call(daemon.client().create_agent(agent("agt-math", steps))).unwrap();

    let signal = daemon.run_to_end(Request::submit("run", Some("agt-math"), json!({ "n": 1 })));

    assert_eq!(signal.status, SignalStatus::Complete, "{:?}", signal.error);
    assert_eq!(signal.response, Some(json!({ "n": 20 })));
}

#[test]
fn failing_step_stops_the_run() {
    if !has_python() {
        return;
    }
    let daemon = Daemon::start();
    let steps = [
        StepKind::code("result = source"),
        StepKind::code("raise ValueError('bad input')"),
        StepKind::code("result = 'unreachable'"),
    ];
    daemon.call(daemon.client().create_agent(agent("agt-fail", steps))).unwrap();

    let signal = daemon.run_to_end(Request::submit("run", Some("agt-fail"), json!({})));

    assert_eq!(signal.status, SignalStatus::Error);
    let error = signal.error.unwrap();
    assert!(error.contains("step 1"), "{error}");
    assert!(error.contains("bad input"), "{error}");
    let session_id = signal.session_id.unwrap();
    let session = daemon.call(daemon.client().get_session(&session_id)).unwrap().unwrap();
    assert_eq!(session.latest_step_idx, Some(1));
}
