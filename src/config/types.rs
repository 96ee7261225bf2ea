//! Configuration Types
//!
//! All pipeline tunables as explicit configuration with sensible defaults.
//! Nothing here is hard-coded at call sites, so any completion provider can
//! be substituted without touching pipeline code.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    cache as cache_constants, circuit_breaker as cb_constants, generation as gen_constants,
    rate_limit as rl_constants,
};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Completion provider settings
    pub provider: ProviderSettings,

    /// Generation defaults
    pub generation: GenerationSettings,

    /// Outbound rate limiting
    pub rate_limit: RateLimitSettings,

    /// Circuit breaker thresholds
    pub circuit_breaker: CircuitBreakerSettings,

    /// Response cache settings
    pub cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            provider: ProviderSettings::default(),
            generation: GenerationSettings::default(),
            rate_limit: RateLimitSettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `TripError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(crate::types::TripError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.generation.temperature
            )));
        }

        if self.generation.timeout_secs == 0 {
            return Err(crate::types::TripError::Config(
                "generation timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.requests_per_minute == 0 {
            return Err(crate::types::TripError::Config(
                "requests_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(crate::types::TripError::Config(
                "circuit breaker failure_threshold must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl_hours == 0 {
            return Err(crate::types::TripError::Config(
                "cache ttl_hours must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Provider Settings
// =============================================================================

/// Completion provider selection and authentication.
///
/// API keys are never serialized to output. The provider converts the key
/// to a `SecretString` internally for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider type: "openai" (real network client) or "scripted"
    /// (deterministic test double), selected once at construction time
    pub provider: String,
    /// Model identifier (provider-specific)
    pub model: String,
    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
    /// API key; never serialized to output for security
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Per-attempt network timeout in seconds
    pub attempt_timeout_secs: u64,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("attempt_timeout_secs", &self.attempt_timeout_secs)
            .finish()
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            attempt_timeout_secs: gen_constants::ATTEMPT_TIMEOUT_SECS,
        }
    }
}

impl ProviderSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

// =============================================================================
// Generation Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Maximum tokens for the full prompt path
    pub max_tokens: u32,
    /// Maximum tokens for the quick, speed-prioritized path
    pub quick_max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,
    /// End-to-end deadline for the generation phase, in seconds
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: gen_constants::FULL_MAX_TOKENS,
            quick_max_tokens: gen_constants::QUICK_MAX_TOKENS,
            temperature: gen_constants::DEFAULT_TEMPERATURE,
            timeout_secs: gen_constants::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GenerationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Rate Limit Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Requests allowed per 60s window
    pub requests_per_minute: u32,
    /// Inter-request politeness delay in milliseconds
    pub politeness_delay_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: rl_constants::DEFAULT_REQUESTS_PER_MINUTE,
            politeness_delay_ms: rl_constants::POLITENESS_DELAY_MS,
        }
    }
}

impl RateLimitSettings {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

// =============================================================================
// Circuit Breaker Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Consecutive half-open successes needed to close the circuit
    pub success_threshold: u32,
    /// Cooldown before open transitions to half-open, in seconds
    pub recovery_timeout_secs: u64,
    /// Trial requests allowed while half-open
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: cb_constants::FAILURE_THRESHOLD,
            success_threshold: cb_constants::SUCCESS_THRESHOLD,
            recovery_timeout_secs: cb_constants::RECOVERY_TIMEOUT_SECS,
            half_open_max_requests: cb_constants::HALF_OPEN_MAX_REQUESTS,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether the response cache participates at all
    pub enabled: bool,
    /// Entry time-to-live in hours
    pub ttl_hours: u64,
    /// Maximum entries held before insert-time eviction
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: cache_constants::TTL_HOURS,
            max_entries: cache_constants::MAX_ENTRIES,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }
}
