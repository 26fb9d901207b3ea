// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use portico_engine::{default_workers, EngineConfig, RetryPolicy, DEFAULT_MODEL};
use portico_storage::DEFAULT_CHECKPOINT_INTERVAL;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: PORTICO_STATE_DIR > XDG_STATE_HOME/portico > ~/.local/state/portico
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("PORTICO_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("portico"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/portico"))
}

fn parsed<T: FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn millis(var: &str) -> Option<Duration> {
    parsed::<u64>(var).map(Duration::from_millis)
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

/// Worker pool size (default: available parallelism).
pub fn workers() -> usize {
    parsed::<usize>("PORTICO_WORKERS").filter(|n| *n > 0).unwrap_or_else(default_workers)
}

/// Hard limit for a single code step.
pub fn sandbox_timeout() -> Duration {
    millis("PORTICO_SANDBOX_TIMEOUT_MS").unwrap_or(Duration::from_secs(30))
}

/// Interpreter the sandbox spawns.
pub fn python() -> String {
    non_empty("PORTICO_PYTHON").unwrap_or_else(|| "python3".to_string())
}

/// Chat-completions URL. Prompt steps fail permanently without one.
pub fn model_endpoint() -> Option<String> {
    non_empty("PORTICO_MODEL_ENDPOINT")
}

pub fn model_api_key() -> Option<String> {
    non_empty("PORTICO_MODEL_API_KEY")
}

/// Per-request timeout for the model client.
pub fn model_timeout() -> Duration {
    millis("PORTICO_MODEL_TIMEOUT_MS").unwrap_or(Duration::from_secs(60))
}

pub fn default_model() -> String {
    non_empty("PORTICO_DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Prompt retry policy (`PORTICO_RETRY_BASE_MS`, `PORTICO_RETRY_MAX_ATTEMPTS`).
pub fn retry_policy() -> RetryPolicy {
    let mut policy = RetryPolicy::default();
    if let Some(base) = millis("PORTICO_RETRY_BASE_MS") {
        policy.base_delay = base;
    }
    if let Some(attempts) = parsed::<u32>("PORTICO_RETRY_MAX_ATTEMPTS").filter(|n| *n > 0) {
        policy.max_attempts = attempts;
    }
    policy
}

/// Shutdown drain timeout (default 5s).
pub fn drain_timeout() -> Duration {
    millis("PORTICO_DRAIN_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    millis("PORTICO_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

pub fn dedup_capacity() -> usize {
    parsed::<usize>("PORTICO_DEDUP_CAPACITY").filter(|n| *n > 0).unwrap_or(10_000)
}

/// Journal entries between snapshots.
pub fn checkpoint_interval() -> u64 {
    parsed::<u64>("PORTICO_CHECKPOINT_EVERY")
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL)
}

/// Engine settings assembled from the variables above.
pub fn engine_config() -> EngineConfig {
    EngineConfig::default()
        .workers(workers())
        .retry(retry_policy())
        .sandbox_timeout(sandbox_timeout())
        .default_model(default_model())
        .dedup_capacity(dedup_capacity())
        .drain_timeout(drain_timeout())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
