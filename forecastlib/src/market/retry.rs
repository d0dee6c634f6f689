use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::market::errors::{ErrorClass, RetryFailure, Retryable};

/// Bounded retry with exponential backoff.
///
/// The wait before retry `n` (zero-based attempt index of the failure) is
/// `base_delay * 2^n`, so with the default 2 s base the waits are 2 s, 4 s,
/// 8 s. There is no wait after the final attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay,
        }
    }

    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }

    // Runs `op` until it succeeds, fails permanently, or attempts run out.
    // `op` receives the zero-based attempt index.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryFailure<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match op(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        log::info!("[{}] succeeded on attempt {}/{}", label, attempt + 1, max_attempts);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };
            let attempts = attempt + 1;

            match error.class() {
                ErrorClass::Permanent => {
                    log::error!("[{}] permanent failure, not retrying: {}", label, error);
                    return Err(RetryFailure::Permanent { attempts, error });
                }
                ErrorClass::Transient => {
                    log::warn!(
                        "[{}] failed (attempt {}/{}): {}",
                        label, attempts, max_attempts, error
                    );
                }
                ErrorClass::Unknown => {
                    log::warn!(
                        "[{}] unclassified error, treating as transient (attempt {}/{}): {}",
                        label, attempts, max_attempts, error
                    );
                }
            }

            if attempts >= max_attempts {
                log::error!("[{}] giving up after {} attempts", label, attempts);
                return Err(RetryFailure::Exhausted { attempts, error });
            }

            let delay = self.delay_for(attempt);
            log::info!("[{}] retrying in {:?}...", label, delay);
            tokio::time::sleep(delay).await;
            attempt = attempts;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::errors::FetchError;
    use std::cell::{Cell, RefCell};
    use tokio::time::Instant;

    #[test]
    fn delays_double_from_the_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn late_success_survives_two_transient_failures() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0);
        let started = Instant::now();

        let result = policy
            .run("TEST", |_| {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(FetchError::Transient("timed out".to_string()))
                    } else {
                        Ok("bars")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("bars"));
        assert_eq!(calls.get(), 3);
        // 2s after the first failure, 4s after the second
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "slept {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(7), "slept {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_stops_immediately() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0);
        let started = Instant::now();

        let result: Result<(), _> = policy
            .run("TEST", |_| {
                calls.set(calls.get() + 1);
                async { Err(FetchError::Permanent("symbol may be delisted".to_string())) }
            })
            .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(RetryFailure::Permanent { attempts: 1, .. })));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error_without_trailing_sleep() {
        let policy = RetryPolicy::default();
        let seen = RefCell::new(Vec::new());
        let started = Instant::now();

        let result: Result<(), _> = policy
            .run("TEST", |attempt| {
                seen.borrow_mut().push(attempt);
                async move { Err(FetchError::Unknown(format!("boom {}", attempt))) }
            })
            .await;

        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        match result {
            Err(RetryFailure::Exhausted { attempts, error }) => {
                assert_eq!(attempts, 3);
                assert_eq!(error, FetchError::Unknown("boom 2".to_string()));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        // 2s + 4s, nothing after the third attempt
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }
}
