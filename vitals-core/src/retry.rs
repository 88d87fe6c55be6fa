//! Bounded retry with linear backoff.
//!
//! The waiting itself goes through a [`Delay`] so callers (and tests) decide
//! how time passes.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Configuration for retry behavior with linear backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the initial one included
    pub max_attempts: u32,
    /// Delay after the n-th failed attempt is `n * backoff_step`
    pub backoff_step: Duration,
    /// Budget for the whole operation, waits included
    pub deadline: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
            deadline: Duration::from_secs(15),
        }
    }
}

impl RetryConfig {
    /// Delay before the next attempt, given the 1-based number of the attempt
    /// that just failed.
    pub fn delay_for_attempt(&self, failed_attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(failed_attempt)
    }
}

#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How one attempt failed.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Worth another try (transport failure, 5xx, timeout).
    Transient(String),
    /// Retrying would not help; returned to the caller as is.
    Permanent(E),
}

#[derive(Debug)]
pub enum RetryFailure<E> {
    Exhausted { attempts: u32, last_cause: String },
    Permanent(E),
}

/// Runs `operation` until it succeeds, fails permanently, runs out of
/// attempts or runs out of deadline. `operation` receives the 1-based
/// attempt number.
pub async fn retry_with_backoff<T, E, F, Fut>(
    label: &str,
    config: &RetryConfig,
    delay: &dyn Delay,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    let started = Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let remaining = config.deadline.saturating_sub(started.elapsed());
        let cause = match tokio::time::timeout(remaining, operation(attempt)).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    info!(operation = label, attempt, "Operation succeeded after retries");
                }
                return Ok(value);
            }
            Ok(Err(AttemptError::Permanent(e))) => return Err(RetryFailure::Permanent(e)),
            Ok(Err(AttemptError::Transient(cause))) => cause,
            Err(_) => format!("deadline of {:?} exceeded", config.deadline),
        };

        if attempt >= max_attempts {
            warn!(
                operation = label,
                attempt,
                max_attempts,
                cause = %cause,
                "Attempt failed, no retries left"
            );
            return Err(RetryFailure::Exhausted {
                attempts: attempt,
                last_cause: cause,
            });
        }

        let wait = config.delay_for_attempt(attempt);
        if started.elapsed() + wait >= config.deadline {
            warn!(
                operation = label,
                attempt,
                cause = %cause,
                "Attempt failed, next retry would exceed the deadline"
            );
            return Err(RetryFailure::Exhausted {
                attempts: attempt,
                last_cause: cause,
            });
        }

        warn!(
            operation = label,
            attempt,
            max_attempts,
            cause = %cause,
            retry_in_ms = wait.as_millis() as u64,
            "Attempt failed, retrying"
        );
        delay.wait(wait).await;
    }
}
