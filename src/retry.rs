//! Bounded retry with exponential backoff for provider calls

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Optional deadline for the whole sequence, measured from the first attempt
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(10),
            max_elapsed: None,
        }
    }
}

impl RetryPolicy {
    /// Delay slept after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, runs out of
/// attempts, or would overrun `max_elapsed`. The last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let start = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempt >= max_attempts || !is_retryable(&err) {
            return Err(err);
        }

        let delay = policy.backoff_for(attempt);
        if let Some(budget) = policy.max_elapsed {
            if start.elapsed() + delay > budget {
                warn!("{}: retry deadline reached after attempt {}: {}", label, attempt, err);
                return Err(err);
            }
        }

        warn!(
            "{}: attempt {}/{} failed, retrying in {:?}: {}",
            label, attempt, max_attempts, delay, err
        );
        sleep(delay).await;
        attempt += 1;
    }
}
