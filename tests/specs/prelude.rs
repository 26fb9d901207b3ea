// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: spawn `porticod`, talk to it over its socket.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

pub use portico_core::{Agent, AgentId, AgentState, SignalStatus, StepKind};
pub use portico_daemon::{ClientError, DaemonClient, Request, Response};
pub use serde_json::{json, Value};
pub use tempfile::TempDir;

/// Upper bound for anything a spec waits on.
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// Poll `check` every 20ms until it holds or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

pub fn porticod() -> PathBuf {
    assert_cmd::cargo::cargo_bin("porticod")
}

/// True when a `python3` interpreter is on PATH.
pub fn has_python() -> bool {
    Command::new("python3")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A stable agent with the given steps, in order.
pub fn agent(id: &str, steps: impl IntoIterator<Item = StepKind>) -> Agent {
    let mut agent = Agent::new(AgentId::from(id), format!("{id} spec agent"));
    agent.state = AgentState::Stable;
    for kind in steps {
        agent.push_step(kind);
    }
    agent
}

/// A stable agent with no steps: runs complete with their payload.
pub fn empty_agent(id: &str) -> Agent {
    agent(id, Vec::new())
}

/// A running `porticod` bound to a temporary state directory.
pub struct Daemon {
    state: Option<TempDir>,
    child: Option<Child>,
    runtime: tokio::runtime::Runtime,
    client: DaemonClient,
}

impl Daemon {
    pub fn start() -> Self {
        Self::start_in(tempfile::tempdir().unwrap())
    }

    /// Start against an existing state directory (for restarts).
    pub fn start_in(state: TempDir) -> Self {
        let child = spawn(state.path());
        let runtime =
            tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let client = DaemonClient::new(state.path().join("daemon.sock"))
            .with_timeout(Duration::from_secs(5));
        let daemon = Self { state: Some(state), child: Some(child), runtime, client };

        let ready = wait_for(SPEC_WAIT_MAX_MS, || daemon.call(daemon.client.ping()).is_ok());
        assert!(ready, "porticod did not answer ping; log:\n{}", daemon.log());
        daemon
    }

    pub fn state_dir(&self) -> &Path {
        self.state.as_ref().unwrap().path()
    }

    pub fn client(&self) -> &DaemonClient {
        &self.client
    }

    /// Drive a client future to completion.
    pub fn call<T>(&self, future: impl Future<Output = T>) -> T {
        self.runtime.block_on(future)
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.state_dir().join("daemon.log")).unwrap_or_default()
    }

    /// Submit and wait for the signal to finish.
    pub fn run_to_end(&self, request: Request) -> portico_core::Signal {
        let accepted = self.call(self.client.submit(request)).unwrap();
        let timeout = Duration::from_millis(SPEC_WAIT_MAX_MS);
        self.call(self.client.wait_for_signal(accepted.id, timeout)).unwrap()
    }

    /// Graceful stop through the socket. Returns the exit status and the
    /// state directory for a restart.
    pub fn stop(mut self) -> (ExitStatus, TempDir) {
        self.call(self.client.shutdown()).unwrap();
        let status = self.wait_exit();
        (status, self.take_state())
    }

    /// SIGKILL, no cleanup. Returns the state directory for a restart.
    pub fn kill(mut self) -> TempDir {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
        }
        self.wait_exit();
        self.take_state()
    }

    fn wait_exit(&mut self) -> ExitStatus {
        let mut child = self.child.take().unwrap();
        let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
        loop {
            if let Some(status) = child.try_wait().unwrap() {
                return status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                panic!("porticod did not exit; log:\n{}", self.log());
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn take_state(&mut self) -> TempDir {
        self.state.take().unwrap()
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Spawn `porticod` for `state_dir` without waiting for it.
pub fn spawn(state_dir: &Path) -> Child {
    Command::new(porticod())
        .env("PORTICO_STATE_DIR", state_dir)
        .env("PORTICO_WORKERS", "2")
        .env("PORTICO_DRAIN_TIMEOUT_MS", "2000")
        .env("RUST_LOG", "debug")
        .env_remove("PORTICO_MODEL_ENDPOINT")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}
