// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandboxed execution of `code` steps.
//!
//! The step's code sees its input bound to `source` and must assign
//! `result`. Whatever `result` holds is serialized back as JSON.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Errors from sandbox operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("failed to start interpreter: {0}")]
    Spawn(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("{0}")]
    Runtime(String),
    #[error("unreadable output: {0}")]
    Output(String),
}

/// Adapter for running step code against a JSON input
#[async_trait]
pub trait SandboxAdapter: Clone + Send + Sync + 'static {
    async fn run(&self, code: &str, input: &Value, timeout: Duration) -> Result<Value, SandboxError>;
}

/// Harness executed by the interpreter. Reads `{"code", "source"}` from
/// stdin and writes a single `{"ok", "result"|"error"}` document to the
/// original stdout. Anything the step prints goes to stderr.
const HARNESS: &str = r#"
import json, sys
out = sys.stdout
sys.stdout = sys.stderr
req = json.load(sys.stdin)
scope = {"source": req["source"]}
def reply(doc):
    out.write(json.dumps(doc))
    out.flush()
try:
    exec(req["code"], scope)
except Exception as e:
    reply({"ok": False, "error": "%s: %s" % (type(e).__name__, e)})
    sys.exit(0)
if "result" not in scope:
    reply({"ok": False, "error": "code did not assign result"})
    sys.exit(0)
try:
    reply({"ok": True, "result": scope["result"]})
except (TypeError, ValueError) as e:
    reply({"ok": False, "error": "result is not JSON-serializable: %s" % e})
"#;

/// Runs code steps in a fresh Python interpreter per call.
#[derive(Clone, Debug)]
pub struct PythonSandbox {
    interpreter: String,
}

impl Default for PythonSandbox {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl PythonSandbox {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self { interpreter: interpreter.into() }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

#[derive(serde::Deserialize)]
struct HarnessReply {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl SandboxAdapter for PythonSandbox {
    async fn run(&self, code: &str, input: &Value, timeout: Duration) -> Result<Value, SandboxError> {
        let request = serde_json::json!({ "code": code, "source": input });
        let request =
            serde_json::to_vec(&request).map_err(|e| SandboxError::Output(e.to_string()))?;

        let mut cmd = tokio::process::Command::new(&self.interpreter);
        cmd.arg("-c")
            .arg(HARNESS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SandboxError::Spawn(format!("{}: {}", self.interpreter, e)))?;

        let exchange = async move {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(&request).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        // Dropping the exchange on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(SandboxError::Spawn(e.to_string())),
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "sandbox timed out");
                return Err(SandboxError::Timeout(timeout));
            }
        };

        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %String::from_utf8_lossy(&output.stderr), "sandbox stderr");
        }

        if output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SandboxError::Runtime(if stderr.is_empty() {
                format!("interpreter exited with {}", output.status)
            } else {
                stderr
            }));
        }

        let reply: HarnessReply = serde_json::from_slice(&output.stdout)
            .map_err(|e| SandboxError::Output(e.to_string()))?;
        if reply.ok {
            Ok(reply.result)
        } else {
            Err(SandboxError::Runtime(reply.error.unwrap_or_else(|| "unknown error".to_string())))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{SandboxAdapter, SandboxError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    type Handler = dyn Fn(&str, &Value) -> Result<Value, SandboxError> + Send + Sync;

    /// Recorded sandbox invocation
    #[derive(Debug, Clone, PartialEq)]
    pub struct SandboxCall {
        pub code: String,
        pub input: Value,
    }

    struct FakeSandboxState {
        calls: Vec<SandboxCall>,
        active: usize,
        max_active: usize,
    }

    /// Fake sandbox for testing.
    ///
    /// By default every call returns its input unchanged. A handler can
    /// compute the result from the code and input instead, and a delay
    /// keeps calls in flight long enough to observe concurrency.
    #[derive(Clone)]
    pub struct FakeSandbox {
        inner: Arc<Mutex<FakeSandboxState>>,
        handler: Arc<Handler>,
        delay: Duration,
    }

    impl Default for FakeSandbox {
        fn default() -> Self {
            Self::with_handler(|_, input| Ok(input.clone()))
        }
    }

    impl FakeSandbox {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_handler(
            handler: impl Fn(&str, &Value) -> Result<Value, SandboxError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeSandboxState {
                    calls: Vec::new(),
                    active: 0,
                    max_active: 0,
                })),
                handler: Arc::new(handler),
                delay: Duration::ZERO,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Get all recorded calls, in the order they started
        pub fn calls(&self) -> Vec<SandboxCall> {
            self.inner.lock().calls.clone()
        }

        /// Highest number of calls that were in flight at the same time
        pub fn max_concurrent(&self) -> usize {
            self.inner.lock().max_active
        }
    }

    #[async_trait]
    impl SandboxAdapter for FakeSandbox {
        async fn run(
            &self,
            code: &str,
            input: &Value,
            _timeout: Duration,
        ) -> Result<Value, SandboxError> {
            {
                let mut state = self.inner.lock();
                state.calls.push(SandboxCall { code: code.to_string(), input: input.clone() });
                state.active += 1;
                state.max_active = state.max_active.max(state.active);
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = (self.handler)(code, input);
            self.inner.lock().active -= 1;
            result
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSandbox, SandboxCall};

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
