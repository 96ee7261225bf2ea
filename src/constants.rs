//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retry policy constants
pub mod retry {
    /// Default maximum attempts for the standard policy
    pub const STANDARD_MAX_ATTEMPTS: u32 = 3;

    /// Base delay for the standard policy (milliseconds)
    pub const STANDARD_BASE_DELAY_MS: u64 = 1_000;

    /// Delay cap for the standard policy (seconds)
    pub const STANDARD_MAX_DELAY_SECS: u64 = 8;

    /// Backoff multiplier for the standard policy
    pub const STANDARD_MULTIPLIER: f64 = 2.0;

    /// Maximum attempts for the rate-limit policy
    ///
    /// Five attempts with a 2.5x multiplier from a 2s base produce delays
    /// of roughly 2s/5s/12.5s/30s, enough to outlast a 60s provider window.
    pub const RATE_LIMIT_MAX_ATTEMPTS: u32 = 5;

    /// Base delay for the rate-limit policy (milliseconds)
    pub const RATE_LIMIT_BASE_DELAY_MS: u64 = 2_000;

    /// Delay cap for the rate-limit policy (seconds)
    pub const RATE_LIMIT_MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier for the rate-limit policy
    pub const RATE_LIMIT_MULTIPLIER: f64 = 2.5;
}

/// Circuit breaker constants
pub mod circuit_breaker {
    /// Number of consecutive failures before opening circuit
    pub const FAILURE_THRESHOLD: u32 = 5;

    /// Duration to wait before attempting recovery (seconds)
    pub const RECOVERY_TIMEOUT_SECS: u64 = 30;

    /// Maximum requests allowed in half-open state
    pub const HALF_OPEN_MAX_REQUESTS: u32 = 1;

    /// Success threshold to close circuit from half-open
    pub const SUCCESS_THRESHOLD: u32 = 1;
}

/// Rate limiter constants
pub mod rate_limit {
    /// Length of the fixed rate-limit window (seconds)
    pub const WINDOW_SECS: u64 = 60;

    /// Default requests allowed per window
    pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 20;

    /// Inter-request politeness delay (milliseconds)
    pub const POLITENESS_DELAY_MS: u64 = 200;
}

/// Response cache constants
pub mod cache {
    /// Cache entry time-to-live (hours)
    pub const TTL_HOURS: u64 = 24;

    /// Maximum entries before oldest are evicted on insert
    pub const MAX_ENTRIES: usize = 1_000;
}

/// Generation constants
pub mod generation {
    /// Default maximum tokens for the full prompt path
    pub const FULL_MAX_TOKENS: u32 = 4_096;

    /// Maximum tokens for the quick, speed-prioritized path
    pub const QUICK_MAX_TOKENS: u32 = 1_500;

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Default end-to-end generation timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

    /// Per-network-attempt timeout (seconds)
    pub const ATTEMPT_TIMEOUT_SECS: u64 = 45;
}

/// Validation constants
pub mod validation {
    /// Number of raw-response characters attached to validation errors
    pub const RAW_PREVIEW_CHARS: usize = 500;
}

/// Budget heuristic constants
pub mod budget {
    /// Declared budgets further than this fraction below the realistic
    /// estimate trigger itinerary optimization
    pub const OPTIMIZE_GAP_THRESHOLD: f64 = -0.20;

    /// Optimization convergence tolerance around the target budget
    pub const CONVERGENCE_TOLERANCE: f64 = 0.10;

    /// Discretionary prices are never scaled below this factor
    pub const MIN_SCALE_FACTOR: f64 = 0.25;
}

/// Quality scoring constants
pub mod quality {
    /// Starting score before penalties
    pub const BASE_SCORE: u32 = 100;

    /// Penalty when any activity has unresolved (0,0) coordinates
    pub const UNRESOLVED_COORDS_PENALTY: u32 = 15;

    /// Penalty when budget deviation exceeds 30%
    pub const BUDGET_DEVIATION_PENALTY: u32 = 10;

    /// Penalty when average activities/day falls below 2
    pub const SPARSE_DAYS_PENALTY: u32 = 15;

    /// Penalty when average activities/day exceeds 8
    pub const OVERPACKED_DAYS_PENALTY: u32 = 10;

    /// Minimum tier boundary for "high"
    pub const HIGH_TIER_FLOOR: u32 = 85;

    /// Minimum tier boundary for "medium"
    pub const MEDIUM_TIER_FLOOR: u32 = 70;

    /// Accuracy estimate never drops below this
    pub const ACCURACY_FLOOR: u32 = 50;
}
