// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use portico_core::test_support::{passthrough_agent, run_signal};
use portico_core::{AgentId, SignalId};
use serde_json::json;

#[test]
fn agent_saved_then_deleted() {
    let mut state = MaterializedState::default();
    state.apply(&StoreEvent::AgentSaved { agent: passthrough_agent("agt-a", 2) });
    assert_eq!(state.agents["agt-a"].steps.len(), 2);

    state.apply(&StoreEvent::AgentDeleted { id: AgentId::from("agt-a") });
    assert!(state.agents.is_empty());
}

#[test]
fn step_ran_bumps_counters() {
    let mut state = MaterializedState::default();
    let agent = passthrough_agent("agt-a", 2);
    let step_id = agent.steps[1].id.clone();
    state.apply(&StoreEvent::AgentSaved { agent });

    for succeeded in [true, false, true] {
        state.apply(&StoreEvent::StepRan {
            agent_id: AgentId::from("agt-a"),
            step_id: step_id.clone(),
            succeeded,
        });
    }

    let step = &state.agents["agt-a"].steps[1];
    assert_eq!((step.run_count, step.success_count), (3, 2));
    assert_eq!(state.agents["agt-a"].steps[0].run_count, 0);
}

#[test]
fn step_ran_for_unknown_agent_is_ignored() {
    let mut state = MaterializedState::default();
    state.apply(&StoreEvent::StepRan {
        agent_id: AgentId::from("agt-gone"),
        step_id: "stp-x".into(),
        succeeded: true,
    });
    assert!(state.agents.is_empty());
}

#[test]
fn terminal_signal_is_not_overwritten_by_stale_copy() {
    let mut state = MaterializedState::default();
    let pending = run_signal(7, "agt-a", json!({}));
    let mut done = pending.clone();
    done.complete(Some(json!(1)), 2).unwrap();

    state.apply(&StoreEvent::SignalSaved { signal: done.clone() });
    state.apply(&StoreEvent::SignalSaved { signal: pending });

    assert_eq!(state.signals[&7], done);
}

#[test]
fn last_signal_id_tracks_highest() {
    let mut state = MaterializedState::default();
    assert_eq!(state.last_signal_id(), 0);
    for id in [3, 9, 4] {
        state.apply(&StoreEvent::SignalSaved { signal: run_signal(id, "agt-a", json!(null)) });
    }
    assert_eq!(state.last_signal_id(), 9);
}

#[test]
fn finalized_session_is_not_overwritten_by_running_copy() {
    let mut state = MaterializedState::default();
    let mut session = RuntimeSession::new(SignalId(1), AgentId::from("agt-a"), json!({}), 1);
    session.begin(2);
    let running = session.clone();
    session.complete(0.1, 3);

    state.apply(&StoreEvent::SessionSaved { session: session.clone() });
    state.apply(&StoreEvent::SessionSaved { session: running });

    assert_eq!(state.sessions[session.id.as_str()], session);
}
