// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs
//!
//! Verify start, single-instance locking, and graceful stop.

use crate::prelude::*;

#[test]
fn daemon_answers_ping_and_records_its_pid() {
    let daemon = Daemon::start();

    let pid = std::fs::read_to_string(daemon.state_dir().join("daemon.pid")).unwrap();
    assert!(pid.trim().parse::<u32>().is_ok(), "pid file: {pid:?}");
    assert!(daemon.state_dir().join("daemon.sock").exists());
}

#[test]
fn second_daemon_on_same_state_dir_exits_with_failure() {
    let daemon = Daemon::start();

    let output = std::process::Command::new(porticod())
        .env("PORTICO_STATE_DIR", daemon.state_dir())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("daemon already running"), "stderr: {stderr}");
    // The first daemon is unaffected.
    daemon.call(daemon.client().ping()).unwrap();
}

#[test]
fn shutdown_request_stops_daemon_and_removes_socket() {
    let daemon = Daemon::start();

    let (status, state) = daemon.stop();

    assert!(status.success(), "exit status: {status}");
    assert!(!state.path().join("daemon.sock").exists());
    assert!(!state.path().join("daemon.pid").exists());
    let log = std::fs::read_to_string(state.path().join("daemon.log")).unwrap();
    assert!(log.contains("Daemon shutdown complete"), "log:\n{log}");
}

#[test]
fn malformed_frame_is_dropped_without_killing_daemon() {
    use std::io::Write;

    let daemon = Daemon::start();
    let mut stream = std::os::unix::net::UnixStream::connect(daemon.client().socket_path()).unwrap();
    stream.write_all(&5u32.to_be_bytes()).unwrap();
    stream.write_all(b"nope!").unwrap();
    drop(stream);

    daemon.call(daemon.client().ping()).unwrap();
}
