// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy for transient store failures.
//!
//! At most three attempts with jittered exponential backoff. Non-transient
//! errors and lock contention are never retried; contention is a result
//! value, so it cannot even reach this path.

use crate::error::StorageError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff parameters for store calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Bound on each individual attempt; an attempt that exceeds it counts
    /// as a transient failure.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given per-attempt bound.
    pub fn with_attempt_timeout(attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Policy with no waiting between attempts, for tests.
    pub fn immediate() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(10),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1 << attempt.min(16));
        let capped = exp.min(self.max_delay);
        if capped.is_zero() {
            return capped;
        }
        // Add up to half the delay as jitter
        let jitter_ms = rand::rng().random_range(0..=capped.as_millis() as u64 / 2);
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Run `f`, retrying transient failures per the policy.
pub async fn with_retries<T, Fut, F>(
    policy: &RetryPolicy,
    op: &str,
    mut f: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, f()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(StorageError::Unavailable(format!(
                "{} exceeded {}s attempt timeout",
                op,
                policy.attempt_timeout.as_secs()
            ))),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < policy.attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(op, attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying store call");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
