// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step executor: runs one step against one input value

use crate::config::EngineConfig;
use crate::error::ExecutionError;
use crate::retry::{retry, RetryPolicy};
use crate::template;
use portico_adapters::{ModelAdapter, ModelError, SandboxAdapter};
use portico_core::{Clock, Step, StepKind};
use serde_json::Value;
use std::time::Duration;

/// Result of executing one step.
#[derive(Debug)]
pub struct StepOutcome {
    pub result: Result<Value, ExecutionError>,
    /// Seconds spent in the collaborator, including retry backoff.
    pub elapsed: f64,
    /// Collaborator calls made (0 when a template failed to render).
    pub attempts: u32,
}

pub struct StepExecutor<X, M, C: Clock> {
    sandbox: X,
    model: M,
    clock: C,
    retry: RetryPolicy,
    sandbox_timeout: Duration,
    default_model: String,
}

impl<X, M, C> StepExecutor<X, M, C>
where
    X: SandboxAdapter,
    M: ModelAdapter,
    C: Clock,
{
    pub fn new(sandbox: X, model: M, clock: C, config: &EngineConfig) -> Self {
        Self {
            sandbox,
            model,
            clock,
            retry: config.retry.clone(),
            sandbox_timeout: config.sandbox_timeout,
            default_model: config.default_model.clone(),
        }
    }

    pub async fn execute(&self, step: &Step, input: &Value) -> StepOutcome {
        let start = self.clock.now();
        let (result, attempts) = match &step.kind {
            StepKind::Code { source } => {
                let result = self
                    .sandbox
                    .run(source, input, self.sandbox_timeout)
                    .await
                    .map_err(ExecutionError::Code);
                (result, 1)
            }
            StepKind::Prompt { template, model } => {
                let model = model.as_deref().unwrap_or(&self.default_model);
                self.prompt(template, model, input).await
            }
        };
        StepOutcome { result, elapsed: self.clock.secs_since(start), attempts }
    }

    async fn prompt(
        &self,
        template: &str,
        model: &str,
        input: &Value,
    ) -> (Result<Value, ExecutionError>, u32) {
        let text = match template::render(template, input) {
            Ok(text) => text,
            Err(e) => return (Err(ExecutionError::Template(e)), 0),
        };

        let out = retry(&self.clock, &self.retry, ModelError::is_transient, |_| {
            self.model.complete(&text, model)
        })
        .await;

        let result = match out.result {
            Ok(reply) => Ok(parse_reply(reply)),
            Err(source) => Err(ExecutionError::Model { attempts: out.attempts, source }),
        };
        (result, out.attempts)
    }
}

/// Model replies that are themselves JSON become that value; anything else
/// is carried as a JSON string.
pub fn parse_reply(reply: String) -> Value {
    serde_json::from_str(reply.trim()).unwrap_or(Value::String(reply))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
