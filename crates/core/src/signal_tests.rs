// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn pending() -> Signal {
    Signal::new(SignalId(1), SignalKind::Run, Some(AgentId::from("agt-1")), json!({}), 10)
}

#[yare::parameterized(
    run     = { "run",     SignalKind::Run },
    command = { "command", SignalKind::Run },
    sync    = { "sync",    SignalKind::Sync },
    fyi     = { "fyi",     SignalKind::Fyi },
)]
fn kind_parses(input: &str, expected: SignalKind) {
    assert_eq!(input.parse::<SignalKind>().unwrap(), expected);
}

#[test]
fn kind_rejects_unknown() {
    assert_eq!(
        "launch".parse::<SignalKind>(),
        Err(SignalError::UnknownKind("launch".to_string()))
    );
}

#[test]
fn kind_deserializes_command_alias() {
    let kind: SignalKind = serde_json::from_value(json!("command")).unwrap();
    assert_eq!(kind, SignalKind::Run);
    assert_eq!(serde_json::to_value(kind).unwrap(), json!("run"));
}

#[test]
fn new_signal_is_pending() {
    let signal = pending();
    assert_eq!(signal.status, SignalStatus::Pending);
    assert_eq!(signal.created_at_ms, 10);
    assert!(!signal.is_terminal());
}

#[test]
fn run_lifecycle_links_session_and_response() {
    let mut signal = pending();
    signal.begin_processing(Some(SessionId::from("rts-1")), 20).unwrap();
    assert_eq!(signal.status, SignalStatus::Processing);
    assert_eq!(signal.session_id, Some(SessionId::from("rts-1")));

    signal.complete(Some(json!({"ok": true})), 30).unwrap();
    assert_eq!(signal.status, SignalStatus::Complete);
    assert_eq!(signal.response, Some(json!({"ok": true})));
    assert_eq!(signal.updated_at_ms, 30);
    assert!(signal.is_terminal());
}

#[test]
fn pending_can_fail_directly() {
    let mut signal = pending();
    signal.fail("agent not found", 11).unwrap();
    assert_eq!(signal.status, SignalStatus::Error);
    assert_eq!(signal.error.as_deref(), Some("agent not found"));
}

#[test]
fn terminal_signals_are_immutable() {
    let mut signal = pending();
    signal.complete(None, 20).unwrap();

    assert!(signal.fail("late", 30).is_err());
    assert!(signal.complete(Some(json!(1)), 30).is_err());
    assert!(signal.begin_processing(None, 30).is_err());
    assert_eq!(signal.status, SignalStatus::Complete);
    assert_eq!(signal.updated_at_ms, 20);
    assert!(signal.error.is_none());
}

#[test]
fn processing_cannot_restart() {
    let mut signal = pending();
    signal.begin_processing(None, 20).unwrap();
    let err = signal.begin_processing(None, 21).unwrap_err();
    assert_eq!(
        err,
        SignalError::Regression {
            id: SignalId(1),
            from: SignalStatus::Processing,
            to: SignalStatus::Processing
        }
    );
}

#[test]
fn optional_fields_are_omitted_from_json() {
    let value = serde_json::to_value(pending()).unwrap();
    assert!(value.get("error").is_none());
    assert!(value.get("session_id").is_none());
    assert_eq!(value["status"], "pending");
    assert_eq!(value["kind"], "run");
}

mod properties {
    use super::*;
    use crate::test_support::strategies::arb_signal_status;
    use proptest::prelude::*;

    fn apply(signal: &mut Signal, to: SignalStatus, at: u64) -> Result<(), SignalError> {
        match to {
            SignalStatus::Pending | SignalStatus::Processing => signal.begin_processing(None, at),
            SignalStatus::Complete => signal.complete(None, at),
            SignalStatus::Error => signal.fail("x", at),
        }
    }

    proptest! {
        #[test]
        fn status_never_moves_backward(moves in prop::collection::vec(arb_signal_status(), 0..8)) {
            let mut signal = pending();
            let mut seen = signal.status;
            for (i, to) in moves.into_iter().enumerate() {
                let was_terminal = signal.is_terminal();
                let result = apply(&mut signal, to, 100 + i as u64);
                if was_terminal {
                    prop_assert!(result.is_err());
                }
                prop_assert!(signal.status >= seen);
                seen = signal.status;
            }
        }
    }
}
