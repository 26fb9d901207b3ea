// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and
//! answering one request per connection against the shared engine.

use std::sync::Arc;
use std::time::Duration;

use portico_adapters::{ModelAdapter, SandboxAdapter};
use portico_core::Clock;
use portico_engine::Engine;
use portico_storage::Store;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::protocol::{self, ProtocolError, Request, Response};

/// Shared daemon context for all request handlers.
pub struct ListenCtx<S, X, M, C: Clock> {
    pub engine: Arc<Engine<S, X, M, C>>,
    /// Cancelled by a `Shutdown` request.
    pub shutdown: CancellationToken,
    pub ipc_timeout: Duration,
}

/// Listener task for accepting socket connections.
pub struct Listener<S, X, M, C: Clock> {
    unix: UnixListener,
    ctx: Arc<ListenCtx<S, X, M, C>>,
}

impl<S, X, M, C> Listener<S, X, M, C>
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx<S, X, M, C>>) -> Self {
        Self { unix, ctx }
    }

    /// Run the listener loop until shutdown, spawning tasks for each connection.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                accepted = self.unix.accept() => match accepted {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
            }
        }
        debug!("listener stopped");
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("Client disconnected"),
        ProtocolError::Timeout => warn!("Connection timeout"),
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single client connection.
async fn handle_connection<R, W, S, X, M, C>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<S, X, M, C>,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    let request = protocol::read_request(&mut reader, ctx.ipc_timeout).await?;

    // Polling requests log at debug, everything else at info
    if matches!(request, Request::Ping | Request::GetSignal { .. } | Request::GetSession { .. }) {
        debug!(request = ?request, "received query");
    } else {
        info!(request = ?request, "received request");
    }

    let stopping = matches!(request, Request::Shutdown);
    let response = handle_request(request, ctx).await;
    debug!("Sending response: {:?}", response);
    let written = protocol::write_response(&mut writer, &response, ctx.ipc_timeout).await;

    // Acknowledge before the daemon starts tearing down.
    if stopping {
        ctx.shutdown.cancel();
    }
    written
}

/// Handle a single request and return a response.
async fn handle_request<S, X, M, C>(
    request: Request,
    ctx: &ListenCtx<S, X, M, C>,
) -> Response
where
    S: Store,
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    match request {
        Request::Ping => Response::Pong,

        request @ Request::Submit { .. } => match request.into_signal_request() {
            Some(Ok(signal)) => match ctx.engine.submit(signal).await {
                Ok(handle) => Response::Signal { signal: Box::new(handle.signal()) },
                Err(e) => Response::error(e.to_string()),
            },
            Some(Err(e)) => Response::error(e.to_string()),
            None => Response::error("malformed submit request"),
        },

        Request::CreateAgent { agent } => Response::Command(ctx.engine.create_agent(agent).await),

        Request::DeleteAgent { id } => Response::Command(ctx.engine.delete_agent(&id).await),

        Request::StartAgent { id } => Response::Command(ctx.engine.start_agent(&id).await),

        Request::StopAgent { id } => Response::Command(ctx.engine.stop_agent(&id).await),

        Request::GetSignal { id } => match ctx.engine.get_signal(id).await {
            Ok(Some(signal)) => Response::Signal { signal: Box::new(signal) },
            Ok(None) => Response::error(format!("signal {id} not found")),
            Err(e) => Response::error(e.to_string()),
        },

        Request::GetSession { id } => match ctx.engine.get_session(&id).await {
            Ok(session) => Response::Session { session: session.map(Box::new) },
            Err(e) => Response::error(e.to_string()),
        },

        Request::ListAgents => match ctx.engine.list_agents().await {
            Ok(agents) => Response::Agents { agents },
            Err(e) => Response::error(e.to_string()),
        },

        Request::Shutdown => Response::ShuttingDown,
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
