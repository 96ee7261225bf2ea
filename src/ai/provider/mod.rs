//! Completion Provider Abstraction
//!
//! Defines the `CompletionProvider` trait for raw text generation.
//! Providers normalize their own failure modes into the closed
//! [`ProviderErrorKind`](crate::types::ProviderErrorKind) taxonomy and
//! enforce the caller-supplied timeout themselves - SDK timeouts are not
//! trusted.
//!
//! ## Modules
//!
//! - `openai`: real network client (chat completions API)
//! - `scripted`: deterministic test double, selected at construction time
//! - `circuit_breaker`: three-state breaker guarding a failing provider

mod circuit_breaker;
mod openai;
mod scripted;

pub use circuit_breaker::{
    BreakerRegistry, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};
pub use openai::OpenAiProvider;
pub use scripted::ScriptedProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderSettings;
use crate::types::{Result, TripError};

// =============================================================================
// Completion Response
// =============================================================================

/// Raw completion result including the text payload and usage metrics
#[derive(Debug, Clone)]
pub struct Completion {
    /// Raw model output; expected (not guaranteed) to contain a JSON object
    pub text: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Wall-clock time spent in the provider call
    pub elapsed: Duration,
    /// Provider and model info
    pub metadata: CompletionMetadata,
}

impl Completion {
    /// Create a completion with text only (usage unknown)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            elapsed: Duration::ZERO,
            metadata: CompletionMetadata::default(),
        }
    }
}

/// Token usage metrics for cost tracking
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Completion metadata
#[derive(Debug, Clone, Default)]
pub struct CompletionMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

// =============================================================================
// Generation Parameters
// =============================================================================

/// Model-specific generation parameters, built per request by the prompt
/// builder and passed through to the provider unchanged
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-attempt deadline enforced by the provider itself
    pub timeout: Duration,
    /// Model identifier; overrides the provider's configured default
    pub model: Option<String>,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Shared provider type for concurrent access across pipeline stages
pub type SharedProvider = Arc<dyn CompletionProvider + Send + Sync>;

/// A single call to an external text-generation endpoint.
///
/// Implementations own provider authentication and map provider-specific
/// errors into the normalized taxonomy.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate raw text for a system+user prompt pair
    async fn complete(&self, prompt: &super::prompt::Prompt, params: &GenerationParams)
    -> Result<Completion>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration.
///
/// The real-vs-deterministic choice is made exactly once here, not per call.
pub fn create_provider(settings: &ProviderSettings) -> Result<SharedProvider> {
    match settings.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(settings.clone())?)),
        "scripted" => Ok(Arc::new(ScriptedProvider::from_settings(settings))),
        other => Err(TripError::Config(format!(
            "unknown provider: {}. Supported: openai, scripted",
            other
        ))),
    }
}
