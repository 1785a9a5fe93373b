//! Bounded retry with exponential backoff and jitter.
//!
//! Backend calls are retried a fixed number of times; the delay between
//! attempts doubles each time up to a cap, with +/- jitter to avoid
//! synchronized retry storms. All delays are injectable so tests run
//! without sleeping ([`RetryPolicy::no_delays`]).

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::{BackendError, BackendResult};

/// Retry schedule for backend calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Fractional jitter applied to each delay (0.1 = +/- 10%).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy with no sleeping between attempts, for tests.
    pub fn no_delays(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay to apply after a failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        let capped = exp.min(self.max_delay.as_secs_f64());
        if self.jitter <= 0.0 || capped <= 0.0 {
            return Duration::from_secs_f64(capped.max(0.0));
        }
        let spread = capped * self.jitter;
        let jittered = capped + rand::rng().random_range(-spread..=spread);
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Run `call` until it succeeds or the policy is exhausted.
///
/// Exhaustion folds the last error into
/// [`BackendError::RetriesExhausted`] so callers can degrade that unit of
/// work without losing the underlying cause.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> BackendResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BackendResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last: Option<BackendError> = None;

    for attempt in 1..=attempts {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, max = attempts, error = %err, "backend call failed");
                last = Some(err);
                if attempt < attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    let last = last.unwrap_or_else(|| BackendError::MalformedResponse("no attempt was made".to_string()));
    Err(BackendError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    })
}
