// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Language-model completion for `prompt` steps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Model failures, split by whether retrying can help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Rate limits, timeouts, unavailable upstream.
    #[error("transient model error: {0}")]
    Transient(String),
    /// Bad request, auth, unknown model, malformed reply.
    #[error("model error: {0}")]
    Permanent(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Transient(_))
    }
}

/// Adapter for sending rendered prompt text to a model
#[async_trait]
pub trait ModelAdapter: Clone + Send + Sync + 'static {
    async fn complete(&self, text: &str, model: &str) -> Result<String, ModelError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Classify an HTTP status from the completion endpoint.
pub fn classify_status(status: u16, body: &str) -> ModelError {
    let detail = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", body.trim())
    };
    match status {
        408 | 429 | 500..=599 => ModelError::Transient(detail),
        _ => ModelError::Permanent(detail),
    }
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone, Debug)]
pub struct HttpModelAdapter {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl HttpModelAdapter {
    /// `endpoint` is the full chat-completions URL. Without one every call
    /// fails permanently.
    pub fn new(endpoint: Option<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, endpoint, api_key }
    }
}

#[async_trait]
impl ModelAdapter for HttpModelAdapter {
    async fn complete(&self, text: &str, model: &str) -> Result<String, ModelError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(ModelError::Permanent("no model endpoint configured".to_string()));
        };

        let body = ChatRequest { model, messages: [ChatMessage { role: "user", content: text }] };
        let mut request = self.client.post(endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                ModelError::Transient(e.to_string())
            } else {
                ModelError::Permanent(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), %model, "model request rejected");
            return Err(classify_status(status.as_u16(), &body));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Permanent(format!("malformed response: {e}")))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::Permanent("response has no message content".to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ModelAdapter, ModelError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Recorded model call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ModelCall {
        pub text: String,
        pub model: String,
    }

    struct FakeModelState {
        script: VecDeque<Result<String, ModelError>>,
        calls: Vec<ModelCall>,
    }

    /// Fake model for testing.
    ///
    /// Scripted replies are consumed in order; once the script runs out,
    /// each call echoes the prompt text back.
    #[derive(Clone)]
    pub struct FakeModel {
        inner: Arc<Mutex<FakeModelState>>,
    }

    impl Default for FakeModel {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeModelState {
                    script: VecDeque::new(),
                    calls: Vec::new(),
                })),
            }
        }
    }

    impl FakeModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn scripted(replies: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
            let model = Self::default();
            model.inner.lock().script.extend(replies);
            model
        }

        pub fn push(&self, reply: Result<String, ModelError>) {
            self.inner.lock().script.push_back(reply);
        }

        pub fn calls(&self) -> Vec<ModelCall> {
            self.inner.lock().calls.clone()
        }

        pub fn attempts(&self) -> usize {
            self.inner.lock().calls.len()
        }
    }

    #[async_trait]
    impl ModelAdapter for FakeModel {
        async fn complete(&self, text: &str, model: &str) -> Result<String, ModelError> {
            let mut state = self.inner.lock();
            state.calls.push(ModelCall { text: text.to_string(), model: model.to_string() });
            state.script.pop_front().unwrap_or_else(|| Ok(text.to_string()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeModel, ModelCall};

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
