//! Retry Manager with Error-Aware Policies
//!
//! Exponential backoff with random jitter around transient provider
//! failures. Two schedules exist and the manager switches between them
//! mid-flight based on the last classified error:
//!
//! - **standard**: 3 attempts, 1s base, 2.0x growth, 8s cap
//! - **rate_limit**: 5 attempts, 2s base, 2.5x growth, 30s cap
//!
//! A rate-limited attempt is governed by the rate-limit schedule from that
//! point on, extending the attempt budget; recovery to a non-rate-limit
//! error switches back. Permanent errors (authentication, quota) are never
//! retried. Cancellation wins every race: before an attempt, against the
//! in-flight call, and against the backoff sleep.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::retry as retry_constants;
use crate::types::{ProviderErrorKind, Result, TripError};

/// One backoff schedule
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Whether computed delays get a random jitter factor
    pub jitter: bool,
}

impl RetryConfig {
    /// Schedule for ordinary transient failures
    pub fn standard() -> Self {
        Self {
            max_attempts: retry_constants::STANDARD_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry_constants::STANDARD_BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::STANDARD_MAX_DELAY_SECS),
            multiplier: retry_constants::STANDARD_MULTIPLIER,
            jitter: true,
        }
    }

    /// Longer, wider schedule for rate-limited providers
    pub fn rate_limit() -> Self {
        Self {
            max_attempts: retry_constants::RATE_LIMIT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry_constants::RATE_LIMIT_BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::RATE_LIMIT_MAX_DELAY_SECS),
            multiplier: retry_constants::RATE_LIMIT_MULTIPLIER,
            jitter: true,
        }
    }

    /// Deterministic (pre-jitter) delay before the given attempt number.
    /// Attempt 1 has no delay; attempt 2 waits `base_delay`; each later
    /// attempt grows by `multiplier`, capped at `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2) as i32;
        let raw = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(raw).min(self.max_delay)
    }
}

/// Progress report emitted before each backoff sleep
#[derive(Debug, Clone)]
pub struct RetryProgress {
    /// 1-based attempt number that just failed
    pub attempt: u32,
    /// Delay before the next attempt
    pub delay: Duration,
    /// Display form of the error that triggered the retry
    pub error: String,
}

/// Retries an async operation according to the classified error.
///
/// By default the error taxonomy decides what is retryable; callers can
/// replace that decision with [`with_retry_predicate`](Self::with_retry_predicate).
pub struct RetryManager {
    standard: RetryConfig,
    rate_limit: RetryConfig,
    retry_predicate: Option<Box<dyn Fn(&TripError) -> bool + Send + Sync>>,
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryManager {
    pub fn new() -> Self {
        Self {
            standard: RetryConfig::standard(),
            rate_limit: RetryConfig::rate_limit(),
            retry_predicate: None,
        }
    }

    /// Override both schedules (for tests and tuning)
    pub fn with_policies(standard: RetryConfig, rate_limit: RetryConfig) -> Self {
        Self {
            standard,
            rate_limit,
            retry_predicate: None,
        }
    }

    /// Replace the taxonomy-based retry decision with a custom predicate.
    /// Schedule selection still follows the classified error kind.
    pub fn with_retry_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&TripError) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Box::new(predicate));
        self
    }

    /// Run `operation` until it succeeds, the active schedule's attempt
    /// budget runs out, a permanent error appears, or `cancel` fires.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(
        &self,
        operation_name: &str,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_progress(operation_name, cancel, operation, |_| {})
            .await
    }

    /// Like [`execute`](Self::execute), additionally invoking `on_retry`
    /// synchronously before every backoff sleep
    pub async fn execute_with_progress<T, F, Fut, P>(
        &self,
        operation_name: &str,
        cancel: &CancellationToken,
        mut operation: F,
        mut on_retry: P,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnMut(&RetryProgress),
    {
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(TripError::Cancelled);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(TripError::Cancelled),
                result = operation(attempt) => result,
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            operation = operation_name,
                            attempt, "Operation recovered after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(TripError::Cancelled) => return Err(TripError::Cancelled),
                Err(e) => e,
            };

            let retryable = match &self.retry_predicate {
                Some(predicate) => predicate(&err),
                None => err.is_retryable(),
            };

            if !retryable {
                debug!(
                    operation = operation_name,
                    error = %err,
                    "Non-retryable error, surfacing immediately"
                );
                return Err(err);
            }

            // The last classified error picks the schedule, including the
            // remaining attempt budget
            let rate_limited = err.provider_kind() == Some(ProviderErrorKind::RateLimit);
            let policy = if rate_limited {
                &self.rate_limit
            } else {
                &self.standard
            };

            if attempt >= policy.max_attempts {
                warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(TripError::RetryExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            // A provider-supplied retry-after hint overrides the computed
            // backoff; jitter applies only to the computed path
            let delay = match retry_after_hint(&err) {
                Some(hint) => hint.min(policy.max_delay),
                None => {
                    let computed = policy.delay_before(attempt + 1);
                    if policy.jitter {
                        apply_jitter(computed)
                    } else {
                        computed
                    }
                }
            };

            on_retry(&RetryProgress {
                attempt,
                delay,
                error: err.to_string(),
            });

            warn!(
                operation = operation_name,
                attempt,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis(),
                rate_limited,
                error = %err,
                "Retrying after backoff"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(TripError::Cancelled),
                _ = sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

fn retry_after_hint(err: &TripError) -> Option<Duration> {
    match err {
        TripError::Provider(e) => e.retry_after,
        _ => None,
    }
}

/// Multiply a delay by a uniform factor in [0.5, 1.5)
fn apply_jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor: f64 = rand::rng().random_range(0.5..1.5);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}
