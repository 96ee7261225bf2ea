//! AI Integration Layer
//!
//! Everything between a structured trip request and a validated itinerary:
//! prompt construction, the provider abstraction, and the resilience stack
//! (retry, rate limiting, circuit breaking, timeouts) plus response
//! validation, budget optimization, and quality scoring.

pub mod budget;
pub mod prompt;
pub mod provider;
pub mod rate_limit;
pub mod retry;
pub mod scoring;
pub mod timeout;
pub mod validation;

pub use budget::{BudgetAssessment, BudgetOptimizer};
pub use prompt::{Prompt, PromptBuilder};
pub use provider::{
    BreakerRegistry, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
    Completion, CompletionMetadata, CompletionProvider, GenerationParams, OpenAiProvider,
    ScriptedProvider, SharedProvider, TokenUsage, create_provider,
};
pub use rate_limit::{RequestQueue, SharedQueue};
pub use retry::{RetryConfig, RetryManager, RetryProgress};
pub use scoring::{QualityReport, QualityScorer, QualityTier};
pub use timeout::with_timeout;
pub use validation::{ResponseValidator, SchemaChecker, SchemaIssue};
