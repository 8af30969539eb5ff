//! Retry policy with exponential backoff
//!
//! A [`RetryPolicy`] wraps any fallible transport call. After failed attempt `n` it waits
//! `backoff_base^n` units (capped) and tries again, up to `max_attempts` attempts in
//! total. When every attempt fails, or an error is not retryable, the last error is
//! surfaced inside [`BazaarError::Transport`].

use crate::config::RetryConfig;
use crate::domain::{BazaarError, Result, TransportError};
use crate::log_retry_attempt;
use std::future::Future;
use std::time::Duration;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: f64,
    unit: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, backoff_base: f64, unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base: backoff_base.max(1.0),
            unit,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Build a policy from a `[*.retry]` configuration section
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.backoff_base,
            Duration::from_millis(config.backoff_unit_ms),
        )
        .with_max_delay(Duration::from_millis(config.max_delay_ms))
    }

    /// A policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, 1.0, Duration::ZERO)
    }

    /// Cap every individual delay
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Maximum number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.powi(attempt.min(i32::MAX as u32) as i32);
        let millis = self.unit.as_millis() as f64 * factor;
        if !millis.is_finite() || millis >= self.max_delay.as_millis() as f64 {
            self.max_delay
        } else {
            Duration::from_millis(millis as u64)
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// # Errors
    ///
    /// Returns [`BazaarError::Transport`] carrying the last error and the number of
    /// attempts made.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_attempts || !err.is_retryable() {
                        tracing::error!(
                            attempts = attempt,
                            error = %err,
                            "Request failed, giving up"
                        );
                        return Err(BazaarError::Transport {
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let delay = self.delay_for(attempt);
                    log_retry_attempt!(attempt, self.max_attempts, delay.as_millis() as u64, err);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use test_case::test_case;

    #[test]
    fn test_delay_is_base_to_the_attempt() {
        let policy = RetryPolicy::new(5, 2.0, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(600));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new(5, 10.0, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30));
        assert_eq!(policy.delay_for(4), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts(), 1);
    }

    #[test_case(3, 0 ; "succeeds first time")]
    #[test_case(3, 1 ; "one transient failure")]
    #[test_case(3, 2 ; "fails until last attempt")]
    #[test_case(5, 4 ; "longer budget")]
    #[tokio::test]
    async fn test_transient_failures_then_success(max_tries: u32, failures: u32) {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(max_tries);

        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < failures {
                        Err(TransportError::Status {
                            status: 503,
                            body: "busy".to_string(),
                        })
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::immediate(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(TransportError::Api {
                        code: "401".to_string(),
                        message: "bad token".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(BazaarError::Transport { attempts: 1, .. })));
    }

    #[test_case(1 ; "single attempt")]
    #[test_case(3 ; "three attempts")]
    #[tokio::test]
    async fn test_exhaustion_makes_exactly_max_tries(max_tries: u32) {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(max_tries);

        let result: Result<()> = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(TransportError::Timeout(format!("attempt {}", n + 1))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), max_tries);
        match result {
            Err(BazaarError::Transport { attempts, source }) => {
                assert_eq!(attempts, max_tries);
                assert_eq!(source.to_string(), format!("Request timeout: attempt {max_tries}"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
