//! Bounded polling with optional backoff.
//!
//! `poll_until` repeatedly waits and checks until the check yields a value,
//! the check fails hard, or the attempt cap is reached.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// How often and how long to keep probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of checks (default: 45).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first check in milliseconds (default: 2000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Multiplier applied to the delay after every check; 1.0 keeps it fixed.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Upper bound for a grown delay in milliseconds (default: 10000).
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    45
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_interval_ms() -> u64 {
    10_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            backoff_factor: default_backoff_factor(),
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

impl RetryPolicy {
    /// Fixed delay between checks.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval_ms: interval.as_millis() as u64,
            backoff_factor: 1.0,
            max_interval_ms: interval.as_millis() as u64,
        }
    }

    /// Delay to wait before the given check (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.backoff_factor <= 1.0 {
            return Duration::from_millis(self.interval_ms);
        }
        let exponent = attempt.saturating_sub(1) as i32;
        let grown = self.interval_ms as f64 * self.backoff_factor.powi(exponent);
        let cap = self.max_interval_ms.max(self.interval_ms) as f64;
        Duration::from_millis(grown.min(cap) as u64)
    }

    /// Total time spent waiting if every check comes back empty.
    pub fn worst_case(&self) -> Duration {
        (1..=self.max_attempts).map(|a| self.delay_for(a)).sum()
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("condition not met after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("check failed on attempt {attempt}: {error}")]
    Aborted { attempt: u32, error: E },
}

/// Wait, check, repeat.
///
/// Each attempt sleeps for the policy delay and then runs `check(attempt)`:
/// - `Ok(Some(value))` ends the loop with that value
/// - `Ok(None)` moves on to the next attempt
/// - `Err(e)` ends the loop immediately with `RetryError::Aborted`
///
/// A check that succeeds on attempt `k` therefore returns after exactly `k`
/// delays.
pub async fn poll_until<T, E, F, Fut>(policy: &RetryPolicy, mut check: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.delay_for(attempt)).await;

        match check(attempt).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => debug!(attempt, max = policy.max_attempts, "condition not met yet"),
            Err(error) => return Err(RetryError::Aborted { attempt, error }),
        }
    }

    Err(RetryError::Exhausted {
        attempts: policy.max_attempts,
    })
}
