//! Unified Error Type System
//!
//! Centralized error types for the whole pipeline.
//! Provides provider-error classification for retry and fallback decisions.
//!
//! ## Error Kinds
//!
//! - **Timeout / RateLimit / ServiceUnavailable**: transient, retried internally
//! - **Authentication / QuotaExceeded**: permanent, surfaced immediately
//! - **Unknown**: conservative retry
//!
//! ## Design Principles
//!
//! - Single unified error type (TripError) for the entire crate
//! - Structured provider errors with kind-based routing
//! - No panic/unwrap - all errors are recoverable

use std::time::Duration;
use thiserror::Error;

use crate::constants::validation as validation_constants;

// =============================================================================
// Provider Error Kinds
// =============================================================================

/// Closed taxonomy of normalized provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The provider call exceeded its deadline
    Timeout,
    /// Billing quota exhausted - fail fast, don't retry
    QuotaExceeded,
    /// Requests-per-window budget exceeded - wait then retry
    RateLimit,
    /// Credentials rejected - fail fast, don't retry
    Authentication,
    /// Provider temporarily down - retry with backoff
    ServiceUnavailable,
    /// Anything unclassified - conservative retry
    Unknown,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::QuotaExceeded => write!(f, "QUOTA_EXCEEDED"),
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ProviderErrorKind {
    /// Check if this kind is retryable on the same provider
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimit | Self::ServiceUnavailable | Self::Unknown
        )
    }

    /// Check if this kind is a permanent failure
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Authentication | Self::QuotaExceeded)
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Normalized provider error with kind, context, and retry hints
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error kind for routing decisions
    pub kind: ProviderErrorKind,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Suggested wait time before retry (if the provider supplied one)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.kind, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Create a new provider error
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    /// Add provider context
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Check if the error is retryable on the same provider
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps provider-specific failures into the closed [`ProviderErrorKind`] taxonomy
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status code (more accurate than string matching)
    pub fn from_status(status: u16, message: &str, provider: &str) -> ProviderError {
        let err = |kind| ProviderError::new(kind, message).provider(provider);

        match status {
            429 => {
                // Quota exhaustion and rate limiting share a status code on
                // most providers; the body text tells them apart.
                if message.to_lowercase().contains("quota")
                    || message.to_lowercase().contains("billing")
                {
                    err(ProviderErrorKind::QuotaExceeded)
                } else {
                    // No retry_after here: the hint is set only when the
                    // provider actually sent a Retry-After header
                    err(ProviderErrorKind::RateLimit)
                }
            }
            401 | 403 => err(ProviderErrorKind::Authentication),
            408 | 504 => err(ProviderErrorKind::Timeout),
            500 | 502 | 503 => err(ProviderErrorKind::ServiceUnavailable),
            _ => err(ProviderErrorKind::Unknown),
        }
    }

    /// Classify a free-form error message from any provider
    pub fn from_message(message: &str, provider: &str) -> ProviderError {
        let lower = message.to_lowercase();
        let err = |kind| ProviderError::new(kind, message).provider(provider);

        if lower.contains("quota") || lower.contains("billing") || lower.contains("insufficient") {
            return err(ProviderErrorKind::QuotaExceeded);
        }

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
        {
            return err(ProviderErrorKind::RateLimit);
        }

        if lower.contains("auth")
            || lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            return err(ProviderErrorKind::Authentication);
        }

        if lower.contains("timeout") || lower.contains("timed out") || lower.contains("deadline") {
            return err(ProviderErrorKind::Timeout);
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("500")
            || lower.contains("unavailable")
            || lower.contains("overloaded")
            || lower.contains("connection")
            || lower.contains("server error")
        {
            return err(ProviderErrorKind::ServiceUnavailable);
        }

        err(ProviderErrorKind::Unknown)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum TripError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Provider Errors
    // -------------------------------------------------------------------------
    /// Normalized provider error with kind and retry hints
    #[error("provider error: {0}")]
    Provider(ProviderError),

    /// All retry attempts were consumed without success
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<TripError>,
    },

    /// Circuit breaker is open and no fallback was configured
    #[error("circuit breaker open for '{dependency}'")]
    CircuitOpen { dependency: String },

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// Model output failed extraction, parsing, or schema validation
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        /// Every violated field path, not just the first
        field_paths: Vec<String>,
        /// First ~500 chars of the offending raw text, for diagnosis
        raw_preview: Option<String>,
    },

    /// Caller cancelled the operation (distinct from timeouts)
    #[error("operation cancelled by caller")]
    Cancelled,

    /// Operation timeout with context
    #[error("timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("config error: {0}")]
    Config(String),

    /// Request queue shut down while requests were pending
    #[error("request queue closed")]
    QueueClosed,
}

impl From<ProviderError> for TripError {
    fn from(err: ProviderError) -> Self {
        TripError::Provider(err)
    }
}

pub type Result<T> = std::result::Result<T, TripError>;

// =============================================================================
// Helper Constructors
// =============================================================================

impl TripError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a validation error, truncating the raw text to a preview
    pub fn validation(message: impl Into<String>, field_paths: Vec<String>, raw: &str) -> Self {
        let preview: String = raw
            .chars()
            .take(validation_constants::RAW_PREVIEW_CHARS)
            .collect();
        Self::Validation {
            message: message.into(),
            field_paths,
            raw_preview: (!preview.is_empty()).then_some(preview),
        }
    }

    /// Provider error kind if this wraps one
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider(e) => Some(e.kind),
            Self::RetryExhausted { source, .. } => source.provider_kind(),
            _ => None,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(ProviderErrorKind::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(
            ProviderErrorKind::QuotaExceeded.to_string(),
            "QUOTA_EXCEEDED"
        );
        assert_eq!(
            ProviderErrorKind::Authentication.to_string(),
            "AUTHENTICATION"
        );
    }

    #[test]
    fn test_kind_retryable() {
        assert!(ProviderErrorKind::Timeout.is_retryable());
        assert!(ProviderErrorKind::RateLimit.is_retryable());
        assert!(ProviderErrorKind::ServiceUnavailable.is_retryable());
        assert!(ProviderErrorKind::Unknown.is_retryable());
        assert!(!ProviderErrorKind::Authentication.is_retryable());
        assert!(!ProviderErrorKind::QuotaExceeded.is_retryable());
    }

    #[test]
    fn test_classify_status() {
        let rate = ErrorClassifier::from_status(429, "Too many requests", "openai");
        assert_eq!(rate.kind, ProviderErrorKind::RateLimit);
        // Classification alone carries no wait hint; that comes from the
        // Retry-After header when present
        assert!(rate.retry_after.is_none());

        let quota = ErrorClassifier::from_status(429, "You exceeded your current quota", "openai");
        assert_eq!(quota.kind, ProviderErrorKind::QuotaExceeded);

        let auth = ErrorClassifier::from_status(401, "Invalid API key", "openai");
        assert_eq!(auth.kind, ProviderErrorKind::Authentication);

        let unavailable = ErrorClassifier::from_status(503, "Service unavailable", "openai");
        assert_eq!(unavailable.kind, ProviderErrorKind::ServiceUnavailable);

        let timeout = ErrorClassifier::from_status(504, "Gateway timeout", "openai");
        assert_eq!(timeout.kind, ProviderErrorKind::Timeout);
    }

    #[test]
    fn test_classify_message() {
        let err = ErrorClassifier::from_message("Connection reset by peer", "openai");
        assert_eq!(err.kind, ProviderErrorKind::ServiceUnavailable);

        let err = ErrorClassifier::from_message("request timed out after 30s", "openai");
        assert_eq!(err.kind, ProviderErrorKind::Timeout);

        let err = ErrorClassifier::from_message("something inexplicable", "openai");
        assert_eq!(err.kind, ProviderErrorKind::Unknown);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ProviderErrorKind::RateLimit, "Too many requests")
            .provider("openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");
    }

    #[test]
    fn test_validation_preview_truncation() {
        let raw = "x".repeat(2_000);
        let err = TripError::validation("bad json", vec![], &raw);
        match err {
            TripError::Validation { raw_preview, .. } => {
                assert_eq!(raw_preview.unwrap().len(), 500);
            }
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn test_provider_kind_through_exhaustion() {
        let inner = TripError::Provider(ProviderError::new(
            ProviderErrorKind::Timeout,
            "deadline exceeded",
        ));
        let err = TripError::RetryExhausted {
            attempts: 3,
            source: Box::new(inner),
        };
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::Timeout));
    }
}
