// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with full jitter for prompt steps

use portico_core::Clock;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Ceiling of the first backoff window.
    pub base_delay: Duration,
    pub multiplier: f64,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Upper bound on any single backoff window.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_attempts: 3,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    portico_core::setters! {
        set {
            base_delay: Duration,
            multiplier: f64,
            max_attempts: u32,
            max_delay: Duration,
        }
    }

    /// Backoff window after failed attempt `attempt` (1-based):
    /// `min(max_delay, base_delay * multiplier^(attempt-1))`.
    pub fn window(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let nanos = (self.base_delay.as_nanos() as f64 * factor).round();
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            self.max_delay
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    /// Full jitter: uniform in `[0, window(attempt)]`.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let window = self.window(attempt);
        if window.is_zero() {
            return window;
        }
        window.mul_f64(rng.gen_range(0.0..=1.0))
    }
}

/// Outcome of [`retry`]: the final result plus how many attempts it took.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
/// or the policy's attempts run out. Backoff sleeps go through `clock`.
pub async fn retry<C, T, E, F, Fut>(
    clock: &C,
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Retried<T, E>
where
    C: Clock,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Retried { result: Ok(value), attempts: attempt },
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                let delay = policy.delay(attempt, &mut rand::thread_rng());
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient failure"
                );
                clock.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Retried { result: Err(e), attempts: attempt },
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
