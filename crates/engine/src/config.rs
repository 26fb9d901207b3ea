// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs

use crate::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker pool size.
    pub workers: usize,
    /// Backoff for transient model failures.
    pub retry: RetryPolicy,
    /// Hard limit for a single code step.
    pub sandbox_timeout: Duration,
    /// Model for prompt steps that do not name one.
    pub default_model: String,
    /// Correlation ids remembered for deduplication.
    pub dedup_capacity: usize,
    /// How long shutdown waits for in-flight runs.
    pub drain_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry: RetryPolicy::default(),
            sandbox_timeout: Duration::from_secs(30),
            default_model: DEFAULT_MODEL.to_string(),
            dedup_capacity: 10_000,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    portico_core::setters! {
        into {
            default_model: String,
        }
        set {
            workers: usize,
            retry: RetryPolicy,
            sandbox_timeout: Duration,
            dedup_capacity: usize,
            drain_timeout: Duration,
        }
    }
}

/// One worker per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
