//! Retry policy for requests against a flaky upstream.

use std::{future::Future, time::Duration};

use rand::Rng;

use crate::error::Result;

/// Exponential backoff with bounded random jitter.
///
/// Only errors classified as retryable by [`crate::Error::is_retryable`] are
/// retried; everything else propagates immediately. After `max_attempts`
/// failures the last error is returned to the caller.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: u32,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(3),
            backoff: 2,
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run the operation, retrying per the policy.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt) + self.random_jitter();
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Delay before the retry following the given zero-based attempt,
    /// without jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * self.backoff.pow(attempt)
    }

    fn random_jitter(&self) -> Duration {
        let bound = self.jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=bound))
    }
}
