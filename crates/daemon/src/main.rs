// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! porticod: runs the agent execution engine behind a Unix socket.

use std::process::ExitCode;
use std::sync::Arc;

use portico_daemon::{env, logging, startup, Config, LifecycleError, ListenCtx, Listener};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("porticod: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = match logging::init(&config.log_path) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("porticod: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to build runtime: {}", e);
            eprintln!("porticod: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("daemon failed: {}", e);
            eprintln!("porticod: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    let result = startup(&config).await?;
    let daemon = result.daemon;

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(ListenCtx {
        engine: Arc::clone(&daemon.engine),
        shutdown: shutdown.clone(),
        ipc_timeout: env::ipc_timeout(),
    });
    let listener = tokio::spawn(Listener::new(result.listener, ctx).run());

    let mut sigterm = signal(SignalKind::terminate())?;
    println!("READY {}", config.socket_path.display());

    tokio::select! {
        _ = shutdown.cancelled() => info!("shutdown requested"),
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = daemon.engine.wait() => error!("engine stopped unexpectedly"),
    }

    shutdown.cancel();
    let _ = listener.await;
    daemon.shutdown().await
}
