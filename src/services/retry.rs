use std::{future::Future, time::Duration};

use rand::Rng;
use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tokio::time::sleep;
use validator::Validate;

/// Bounded exponential backoff.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Attempts per operation, the first one included.
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: u32,
    /// Wait after the first failure.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub base_backoff: Duration,
    /// Upper bound of the doubled wait.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_backoff: Duration,
    /// Random extra wait added to each backoff.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub jitter_max: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1_000),
            max_backoff: Duration::from_secs(8),
            jitter_max: Some(Duration::from_millis(250)),
        }
    }
}

impl RetryPolicy {
    /// Wait (jitter excluded) after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }

    fn jitter(&self) -> Duration {
        match self.jitter_max {
            Some(max) if !max.is_zero() => {
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::rng().random_range(0..=max_ms))
            }
            _ => Duration::ZERO,
        }
    }
}

/// Run `f` until it succeeds or `policy.max_attempts` attempts failed.
///
/// `on_retry` is called with the failed attempt number and its error each time another attempt
/// will follow; the error of the last attempt is returned instead.
pub async fn retry_with_policy<F, Fut, T, E, R>(
    policy: &RetryPolicy,
    mut on_retry: R,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(u32, &E),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(err) => {
                on_retry(attempt, &err);
                let wait = policy.backoff_for(attempt) + policy.jitter();
                sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
