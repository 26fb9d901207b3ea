// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use portico_adapters::{HttpModelAdapter, PythonSandbox};
use portico_core::SystemClock;
use portico_engine::{Engine, EngineDeps};
use portico_storage::JournalStore;
use tokio::net::UnixListener;
use tracing::info;

use crate::env;

use super::{Config, DaemonState, LifecycleError, StartupResult};

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // A failed lock means the files belong to the running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Open without truncating so a running daemon's PID survives a failed attempt.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Replay the journal
    if let Some(parent) = config.journal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = JournalStore::open(&config.journal_path)?
        .with_checkpoint_interval(env::checkpoint_interval());

    // 4. Start the engine (recovers queued and interrupted signals)
    let deps = EngineDeps {
        store: store.clone(),
        sandbox: PythonSandbox::new(env::python()),
        model: HttpModelAdapter::new(env::model_endpoint(), env::model_api_key(), env::model_timeout()),
    };
    let engine = Engine::start(deps, SystemClock, env::engine_config()).await?;

    // 5. Bind the socket, replacing one left by a crashed daemon
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = match UnixListener::bind(&config.socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            // The engine is already running; stop its workers before bailing.
            let _ = engine.shutdown().await;
            return Err(LifecycleError::BindFailed(config.socket_path.clone(), e));
        }
    };

    info!(
        state_dir = %config.state_dir.display(),
        socket = %config.socket_path.display(),
        "daemon started"
    );

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            engine: Arc::new(engine),
            store,
        },
        listener,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
