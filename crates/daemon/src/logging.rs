// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log file setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::lifecycle::LifecycleError;

/// Route `tracing` events to `log_path` through a non-blocking writer.
///
/// Reads `RUST_LOG`; defaults to `info`. Keep the returned guard alive
/// until exit so buffered lines are flushed.
pub fn init(log_path: &Path) -> Result<WorkerGuard, LifecycleError> {
    let (dir, file) = match (log_path.parent(), log_path.file_name()) {
        (Some(dir), Some(file)) => (dir, file),
        _ => {
            return Err(LifecycleError::Logging(format!(
                "invalid log path: {}",
                log_path.display()
            )))
        }
    };
    std::fs::create_dir_all(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| LifecycleError::Logging(e.to_string()))?;
    Ok(guard)
}
