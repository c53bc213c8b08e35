//! Retry and backoff
//!
//! Mutations against the document store are retried on transient failures
//! only. Validation, authorization and precondition failures surface on the
//! first attempt.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Backoff strategy for retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Linear increase: delay * attempt
    Linear,
    /// Exponential increase: delay * 2^attempt
    Exponential,
    /// Exponential with up to 10% jitter to spread out concurrent retries
    ExponentialWithJitter,
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number
    ///
    /// # Arguments
    /// - `attempt`: Zero-based attempt number (0 = first retry)
    /// - `initial_delay`: Base delay duration
    /// - `max_delay`: Maximum delay duration
    pub fn calculate_delay(
        &self,
        attempt: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Duration {
        use rand::Rng;

        let delay = match self {
            BackoffStrategy::Fixed => initial_delay,
            BackoffStrategy::Linear => initial_delay.saturating_mul(attempt.saturating_add(1)),
            BackoffStrategy::Exponential => {
                initial_delay.saturating_mul(2u32.saturating_pow(attempt))
            }
            BackoffStrategy::ExponentialWithJitter => {
                let base_delay = initial_delay.saturating_mul(2u32.saturating_pow(attempt));
                let jitter =
                    (base_delay.as_millis() as f64 * 0.1 * rand::thread_rng().gen::<f64>()) as u64;
                base_delay.saturating_add(Duration::from_millis(jitter))
            }
        };

        delay.min(max_delay)
    }
}

/// Retry policy configuration
///
/// Delays are kept in milliseconds so the policy reads naturally from TOML:
///
/// ```toml
/// [retry]
/// max_attempts = 3
/// initial_delay_ms = 100
/// max_delay_ms = 2000
/// strategy = "exponential"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 = no retries)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Backoff strategy to use
    pub strategy: BackoffStrategy,
}

impl RetryPolicy {
    /// Exponential backoff, three retries, 100ms doubling up to 2s
    pub fn exponential() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Fixed delay between retries
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            max_attempts: 3,
            initial_delay_ms: ms,
            max_delay_ms: ms,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO).with_max_attempts(0)
    }

    /// Set maximum retry attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, enable: bool) -> Self {
        self.strategy = if enable {
            BackoffStrategy::ExponentialWithJitter
        } else {
            BackoffStrategy::Exponential
        };
        self
    }

    /// Calculate delay for a specific retry
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.strategy.calculate_delay(
            attempt,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    /// Execute an async operation, retrying every failure
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Execute an async operation, retrying only failures accepted by
    /// `should_retry`. Any other error is returned immediately.
    pub async fn execute_if<F, Fut, T, E, P>(&self, mut operation: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if attempt >= self.max_attempts || !should_retry(&err) {
                        return Err(err);
                    }

                    let delay = self.calculate_delay(attempt);
                    tracing::debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }

                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_delays() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(1);

        assert_eq!(BackoffStrategy::Fixed.calculate_delay(3, base, max), base);
        assert_eq!(
            BackoffStrategy::Linear.calculate_delay(2, base, max),
            Duration::from_millis(300)
        );
        assert_eq!(
            BackoffStrategy::Exponential.calculate_delay(2, base, max),
            Duration::from_millis(400)
        );
        assert_eq!(BackoffStrategy::Exponential.calculate_delay(10, base, max), max);
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let delay = BackoffStrategy::ExponentialWithJitter.calculate_delay(
            1,
            Duration::from_millis(100),
            Duration::from_secs(10),
        );
        assert!(delay >= Duration::from_millis(200));
        assert!(delay <= Duration::from_millis(220));
    }

    #[tokio::test]
    async fn test_execute_if_retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::ZERO).with_max_attempts(3);

        let result: Result<u32, &str> = policy
            .execute_if(
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_if_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::ZERO).with_max_attempts(5);

        let result: Result<(), &str> = policy
            .execute_if(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("forbidden")
                },
                |e| *e != "forbidden",
            )
            .await;

        assert_eq!(result, Err("forbidden"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::ZERO).with_max_attempts(2);

        let result: Result<(), &str> = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down")
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
