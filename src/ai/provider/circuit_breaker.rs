//! Circuit Breaker for Provider Resilience
//!
//! Prevents cascading failures when the completion provider is down.
//! Sustained failures trip the circuit; while open, guarded calls fail
//! fast with `TripError::CircuitOpen` instead of burning the retry and
//! rate-limit budget on a dependency that cannot answer.
//!
//! ## States
//!
//! - **Closed**: normal operation, requests flow through
//! - **Open**: provider is failing, requests are rejected immediately
//! - **HalfOpen**: testing if provider has recovered
//!
//! ## Transitions
//!
//! ```text
//! Closed --[failure_threshold reached]--> Open
//! Open --[recovery timeout elapsed]--> HalfOpen
//! HalfOpen --[success_threshold successes]--> Closed
//! HalfOpen --[failure]--> Open
//! ```

use dashmap::DashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerSettings;
use crate::constants::circuit_breaker as cb_constants;
use crate::types::{Result, TripError};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests flow through
    Closed,
    /// Provider is failing - requests rejected immediately
    Open,
    /// Testing recovery - limited requests allowed
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,
    /// Number of consecutive successes in half-open to close circuit
    pub success_threshold: u32,
    /// Duration to wait before transitioning from open to half-open
    pub open_timeout: Duration,
    /// Maximum requests allowed in half-open state
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: cb_constants::FAILURE_THRESHOLD,
            success_threshold: cb_constants::SUCCESS_THRESHOLD,
            open_timeout: Duration::from_secs(cb_constants::RECOVERY_TIMEOUT_SECS),
            half_open_max_requests: cb_constants::HALF_OPEN_MAX_REQUESTS,
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            success_threshold: settings.success_threshold,
            open_timeout: settings.recovery_timeout(),
            half_open_max_requests: settings.half_open_max_requests,
        }
    }
}

/// Unified internal state - all mutable state in single struct
/// to ensure atomicity of state transitions
#[derive(Debug)]
struct CircuitBreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_requests: u32,
    opened_at: Option<Instant>,
    blocked_count: u64,
}

impl CircuitBreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_requests: 0,
            opened_at: None,
            blocked_count: 0,
        }
    }

    fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.success_count = 0;
        self.half_open_requests = 0;
        self.opened_at = None;
    }
}

/// Thread-safe circuit breaker with unified state management.
///
/// All state is protected by a single RwLock to ensure consistency
/// between failure counts and state transitions.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    dependency: String,
    inner: RwLock<CircuitBreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker guarding a named dependency
    pub fn new(dependency: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            dependency: dependency.into(),
            inner: RwLock::new(CircuitBreakerInner::new()),
        }
    }

    /// Create with default configuration
    pub fn with_defaults(dependency: impl Into<String>) -> Self {
        Self::new(dependency, CircuitBreakerConfig::default())
    }

    /// Create from pipeline configuration
    pub fn from_settings(dependency: impl Into<String>, settings: &CircuitBreakerSettings) -> Self {
        Self::new(dependency, CircuitBreakerConfig::from(settings))
    }

    /// Run an operation under the breaker.
    ///
    /// If the circuit is open the operation is never started and the call
    /// fails fast with `TripError::CircuitOpen`. Otherwise the outcome is
    /// recorded: success closes failure counters, failure advances them.
    /// Cancellation is not counted as a dependency failure.
    pub async fn guard<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(op, None::<fn() -> futures::future::Ready<Result<T>>>)
            .await
    }

    /// Run `primary` under the breaker, routing to `fallback` when the
    /// circuit is open or the primary fails.
    ///
    /// The fallback runs outside the breaker: its outcome never counts
    /// against the guarded dependency.
    pub async fn execute<T, P, PFut, F, FFut>(
        &self,
        primary: P,
        fallback: Option<F>,
    ) -> Result<T>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<T>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T>>,
    {
        if !self.allow_request() {
            return match fallback {
                Some(fallback) => {
                    tracing::info!(
                        "Circuit breaker [{}]: OPEN, routing to fallback",
                        self.dependency
                    );
                    fallback().await
                }
                None => Err(TripError::CircuitOpen {
                    dependency: self.dependency.clone(),
                }),
            };
        }

        match primary().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(TripError::Cancelled) => Err(TripError::Cancelled),
            Err(e) => {
                self.record_failure();
                match fallback {
                    Some(fallback) => {
                        tracing::warn!(
                            "Circuit breaker [{}]: primary failed ({}), trying fallback",
                            self.dependency,
                            e
                        );
                        fallback().await
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Get current circuit state (checking for timeout transitions)
    pub fn state(&self) -> CircuitState {
        // Check for open -> half-open transition
        self.check_state_transition();

        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .state
    }

    /// Check if a request should be allowed
    ///
    /// Returns `true` if the request can proceed, `false` if circuit is open.
    pub fn allow_request(&self) -> bool {
        self.check_state_transition();

        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                inner.blocked_count += 1;
                tracing::debug!(
                    "Circuit breaker [{}]: Request blocked (circuit OPEN)",
                    self.dependency
                );
                false
            }
            CircuitState::HalfOpen => {
                if inner.half_open_requests < self.config.half_open_max_requests {
                    inner.half_open_requests += 1;
                    tracing::debug!(
                        "Circuit breaker [{}]: Allowing test request ({}/{})",
                        self.dependency,
                        inner.half_open_requests,
                        self.config.half_open_max_requests
                    );
                    true
                } else {
                    inner.blocked_count += 1;
                    tracing::debug!(
                        "Circuit breaker [{}]: Half-open request limit reached",
                        self.dependency
                    );
                    false
                }
            }
        }
    }

    /// Record a successful request
    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Reset failure count on any success
        inner.failure_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;

            if inner.success_count >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.success_count = 0;
                inner.half_open_requests = 0;
                inner.opened_at = None;

                tracing::info!(
                    "Circuit breaker [{}]: Closed (dependency recovered)",
                    self.dependency
                );
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Reset success count on any failure
        inner.success_count = 0;

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;

                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    inner.half_open_requests = 0;

                    tracing::warn!(
                        "Circuit breaker [{}]: Opened after {} failures (timeout: {:?})",
                        self.dependency,
                        self.config.failure_threshold,
                        self.config.open_timeout
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Any failure in half-open immediately opens the circuit
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_requests = 0;
                inner.failure_count = 0;

                tracing::warn!(
                    "Circuit breaker [{}]: Re-opened after failure in half-open state",
                    self.dependency
                );
            }
            CircuitState::Open => {
                // Already open, nothing to do
            }
        }
    }

    /// Get statistics for monitoring
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        CircuitBreakerStats {
            dependency: self.dependency.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            blocked_count: inner.blocked_count,
            time_in_state: inner.opened_at.map(|t| t.elapsed()),
        }
    }

    /// Force reset to closed state (for manual intervention)
    pub fn reset(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.reset();

        tracing::info!(
            "Circuit breaker [{}]: Manually reset to CLOSED",
            self.dependency
        );
    }

    /// Check if state transition is needed (open -> half-open)
    fn check_state_transition(&self) {
        let should_transition = {
            let inner = self
                .inner
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            if inner.state == CircuitState::Open {
                if let Some(opened_at) = inner.opened_at {
                    opened_at.elapsed() >= self.config.open_timeout
                } else {
                    false
                }
            } else {
                false
            }
        };

        if should_transition {
            let mut inner = self
                .inner
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            // Double-check state (may have changed between read and write)
            if inner.state == CircuitState::Open {
                inner.state = CircuitState::HalfOpen;
                inner.half_open_requests = 0;
                inner.success_count = 0;

                tracing::info!(
                    "Circuit breaker [{}]: Transitioning to HALF_OPEN (testing recovery)",
                    self.dependency
                );
            }
        }
    }
}

/// Registry of breakers keyed by dependency name.
///
/// Every guarded dependency gets exactly one breaker, shared by everyone
/// asking for the same name, so failure counts aggregate across callers.
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    settings: CircuitBreakerSettings,
}

impl BreakerRegistry {
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        Self {
            breakers: DashMap::new(),
            settings,
        }
    }

    /// Fetch the breaker for a dependency, creating it on first use
    pub fn get_or_create(&self, dependency: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::from_settings(dependency, &self.settings))
            })
            .clone()
    }

    /// Stats for every registered breaker
    pub fn stats(&self) -> Vec<CircuitBreakerStats> {
        self.breakers.iter().map(|entry| entry.stats()).collect()
    }
}

/// Statistics for monitoring circuit breaker state
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub dependency: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub blocked_count: u64,
    pub time_in_state: Option<Duration>,
}

impl CircuitBreakerStats {
    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        let time_str = self
            .time_in_state
            .map(|d| format!(" for {:.1}s", d.as_secs_f64()))
            .unwrap_or_default();

        format!(
            "[{}] {} | failures={} successes={} blocked={}{}",
            self.dependency,
            self.state,
            self.failure_count,
            self.success_count,
            self.blocked_count,
            time_str
        )
    }
}
