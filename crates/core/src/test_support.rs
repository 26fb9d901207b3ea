// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Agent, AgentId, AgentState, Signal, SignalId, SignalKind, StepKind};
use serde_json::Value;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use crate::signal::{SignalKind, SignalStatus};
    use proptest::prelude::*;
    use serde_json::Value;

    pub fn arb_signal_kind() -> impl Strategy<Value = SignalKind> {
        prop_oneof![Just(SignalKind::Run), Just(SignalKind::Sync), Just(SignalKind::Fyi)]
    }

    pub fn arb_signal_status() -> impl Strategy<Value = SignalStatus> {
        prop_oneof![
            Just(SignalStatus::Pending),
            Just(SignalStatus::Processing),
            Just(SignalStatus::Complete),
            Just(SignalStatus::Error),
        ]
    }

    /// Small JSON documents: scalars, arrays, and string-keyed objects.
    pub fn arb_payload() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9 ]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

/// A stable agent whose steps are the given kinds, in order.
pub fn agent_with(id: &str, kinds: impl IntoIterator<Item = StepKind>) -> Agent {
    Agent::builder().id(id).state(AgentState::Stable).step_kinds(kinds).build()
}

/// A stable agent with `n` code steps that each pass their input through.
pub fn passthrough_agent(id: &str, n: usize) -> Agent {
    agent_with(id, (0..n).map(|_| StepKind::code("result = source")))
}

pub fn run_signal(id: u64, agent: &str, payload: Value) -> Signal {
    Signal::new(SignalId(id), SignalKind::Run, Some(AgentId::from(agent)), payload, 1_000_000)
}
