//! Exponential backoff for the one operation the harness retries: opening the
//! database connection while the compose stack is still starting.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before retry `n` (1-based) is `base^n` units
    pub base: u32,
    pub unit: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base: 2,
            unit: Duration::from_secs(1),
        }
    }
}

/// Final failure of a retried operation
#[derive(Debug)]
pub struct RetriesExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl Backoff {
    /// Delay slept before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.unit * self.base.saturating_pow(retry)
    }

    /// Every delay in order, for the worst case where all attempts fail
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|n| self.delay_for(n)).collect()
    }

    pub fn worst_case_wait(&self) -> Duration {
        self.schedule().into_iter().sum()
    }

    /// Run `op` until it succeeds or `max_retries` retries have failed
    pub async fn retry<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetriesExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt > self.max_retries => {
                    return Err(RetriesExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        retry_in_secs = delay.as_secs(),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
