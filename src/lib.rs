//! TripWeaver - AI Itinerary Generation Pipeline
//!
//! Turns a structured trip request into a validated, budget-checked,
//! quality-scored day-by-day itinerary using an LLM completion provider.
//!
//! ## Core Features
//!
//! - **Resilient Generation**: retry with error-aware backoff, a global
//!   rate-limit queue, and a circuit breaker around the provider
//! - **Strict Validation**: model output must parse and pass a full
//!   schema check; malformed responses fail, they are never repaired
//! - **Budget Optimization**: unrealistic budgets are rescaled across
//!   discretionary categories, never essentials
//! - **Quality Scoring**: every itinerary ships with a score, tier, and
//!   the penalties behind them
//! - **Response Cache**: fingerprint-keyed TTL cache for identical trips
//!
//! ## Quick Start
//!
//! ```ignore
//! use tripweaver::{Config, GenerationOptions, GenerationRequest, ItineraryOrchestrator};
//!
//! let config = Config::default();
//! let orchestrator = ItineraryOrchestrator::new(config)?;
//! let result = orchestrator
//!     .generate_itinerary(&request, &GenerationOptions::default())
//!     .await?;
//! println!("{} days, quality {}", result.itinerary.days.len(), result.quality.tier);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: prompt building, provider abstraction, resilience stack,
//!   validation, budget optimization, quality scoring
//! - [`pipeline`]: the orchestrator state machine, response cache, metrics
//! - [`config`]: layered configuration (defaults, file, environment)
//! - [`types`]: request/response types and the error taxonomy

pub mod ai;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{ProviderError, ProviderErrorKind, Result, TripError};

// Request / Response
pub use types::{
    AccommodationTier, Budget, GenerationOptions, GenerationRequest, ItineraryResponse,
    TransportMode, TravelPace, Travelers,
};

// Pipeline
pub use ai::{QualityReport, QualityTier, SharedProvider, create_provider};
pub use pipeline::{
    ItineraryOrchestrator, ItineraryResult, MetricsSummary, PerformanceMetrics, ResultMetadata,
};
