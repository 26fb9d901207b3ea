// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the daemon socket.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use portico_core::{Agent, AgentId, RuntimeSession, SessionId, Signal, SignalId};
use portico_engine::CommandResponse;
use thiserror::Error;
use tokio::net::UnixStream;

use crate::protocol::{self, ProtocolError, Request, Response};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to {}: {source}", path.display())]
    Connect { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The daemon answered with `Error`.
    #[error("{0}")]
    Rejected(String),

    #[error("daemon is shutting down")]
    ShuttingDown,

    #[error("unexpected response: {0:?}")]
    Unexpected(Box<Response>),

    #[error("signal {0} did not finish in time")]
    WaitTimeout(SignalId),
}

/// One request per connection, like the daemon expects.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into(), timeout: crate::env::ipc_timeout() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a request and return the raw response.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| ClientError::Connect { path: self.socket_path.clone(), source })?;
        let (mut reader, mut writer) = stream.into_split();
        protocol::write_request(&mut writer, request, self.timeout).await?;
        Ok(protocol::read_response(&mut reader, self.timeout).await?)
    }

    /// Like [`send`](Self::send), with `Error` and `ShuttingDown` mapped to errors.
    async fn call(&self, request: &Request) -> Result<Response, ClientError> {
        match self.send(request).await? {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            Response::ShuttingDown => Err(ClientError::ShuttingDown),
            response => Ok(response),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.call(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    /// Submit a signal. Returns it as recorded at acceptance.
    pub async fn submit(&self, request: Request) -> Result<Signal, ClientError> {
        self.signal(&request).await
    }

    pub async fn get_signal(&self, id: SignalId) -> Result<Signal, ClientError> {
        self.signal(&Request::GetSignal { id }).await
    }

    async fn signal(&self, request: &Request) -> Result<Signal, ClientError> {
        match self.call(request).await? {
            Response::Signal { signal } => Ok(*signal),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    /// Poll until the signal reaches `complete` or `error`.
    pub async fn wait_for_signal(
        &self,
        id: SignalId,
        timeout: Duration,
    ) -> Result<Signal, ClientError> {
        let deadline = Instant::now() + timeout;
        loop {
            let signal = self.get_signal(id).await?;
            if signal.is_terminal() {
                return Ok(signal);
            }
            if Instant::now() >= deadline {
                return Err(ClientError::WaitTimeout(id));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Option<RuntimeSession>, ClientError> {
        match self.call(&Request::GetSession { id: id.clone() }).await? {
            Response::Session { session } => Ok(session.map(|s| *s)),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    pub async fn create_agent(&self, agent: Agent) -> Result<CommandResponse, ClientError> {
        self.command(&Request::CreateAgent { agent }).await
    }

    pub async fn delete_agent(&self, id: &str) -> Result<CommandResponse, ClientError> {
        self.command(&Request::DeleteAgent { id: AgentId::from(id) }).await
    }

    pub async fn start_agent(&self, id: &str) -> Result<CommandResponse, ClientError> {
        self.command(&Request::StartAgent { id: AgentId::from(id) }).await
    }

    pub async fn stop_agent(&self, id: &str) -> Result<CommandResponse, ClientError> {
        self.command(&Request::StopAgent { id: AgentId::from(id) }).await
    }

    async fn command(&self, request: &Request) -> Result<CommandResponse, ClientError> {
        match self.call(request).await? {
            Response::Command(response) => Ok(response),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ClientError> {
        match self.call(&Request::ListAgents).await? {
            Response::Agents { agents } => Ok(agents),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    /// Ask the daemon to stop. Succeeds once it acknowledges.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }
}
