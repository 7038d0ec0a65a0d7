//! Bounded retry with exponential backoff and jitter
//!
//! Only transport-class failures are retried; application-level errors
//! (bad credentials, rejected calls) propagate on the first attempt.

use std::fmt::Display;
use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff for a given zero-based attempt: `base * 2^attempt`
    /// capped at `max_delay`, jittered into `[delay/2, delay]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        exp.mul_f64(jitter)
    }

    /// Run `op`, retrying failures that `is_retryable` accepts, up to
    /// `max_attempts` total attempts.
    pub async fn run<'a, T, E: Display>(
        &self,
        what: &str,
        is_retryable: impl Fn(&E) -> bool,
        mut op: impl FnMut() -> BoxFuture<'a, Result<T, E>>,
    ) -> Result<T, E> {
        let attempts = self.max_attempts.max(1);
        for attempt in 0..attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) && attempt + 1 < attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{what} failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!()
    }
}
