//! Itinerary Generation Pipeline
//!
//! The orchestrator drives one request through a fixed state machine:
//!
//! ```text
//! CACHE_LOOKUP -> GENERATING -> VALIDATING -> OPTIMIZING -> CACHING -> DONE
//!                      |             |
//!                      +------- FAILED <-----+
//! ```
//!
//! - `CACHE_LOOKUP` short-circuits straight to `DONE` on a fingerprint hit
//! - `GENERATING` runs the retry loop outermost: every attempt is
//!   submitted to the request queue as its own job and, once drained,
//!   passes through the circuit breaker to the provider. Re-queueing each
//!   attempt keeps FIFO fairness across concurrent requests during a
//!   backoff, and the breaker sees each attempt individually. The whole
//!   phase is bounded end-to-end by the generation timeout
//! - A failed provider call is surfaced, never papered over with
//!   fabricated content
//! - Cancellation aborts before the cache write; a cancelled request
//!   never populates the cache

mod cache;
mod metrics;

pub use cache::{CacheStats, CachedItinerary, ResponseCache};
pub use metrics::{MetricsCollector, MetricsSummary, PerformanceMetrics, SharedMetrics};

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info};
use uuid::Uuid;

use crate::ai::budget::BudgetOptimizer;
use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::{
    BreakerRegistry, CircuitBreaker, Completion, GenerationParams, SharedProvider, create_provider,
};
use crate::ai::rate_limit::{RequestQueue, SharedQueue};
use crate::ai::retry::RetryManager;
use crate::ai::scoring::{QualityReport, QualityScorer};
use crate::ai::timeout::with_timeout;
use crate::ai::validation::ResponseValidator;
use crate::config::Config;
use crate::types::{GenerationOptions, GenerationRequest, ItineraryResponse, Result, TripError};

// =============================================================================
// Pipeline States
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    CacheLookup,
    Generating,
    Validating,
    Optimizing,
    Caching,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CacheLookup => write!(f, "CACHE_LOOKUP"),
            Self::Generating => write!(f, "GENERATING"),
            Self::Validating => write!(f, "VALIDATING"),
            Self::Optimizing => write!(f, "OPTIMIZING"),
            Self::Caching => write!(f, "CACHING"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// How a result was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// "ai" for a fresh generation, "cache" for a fingerprint hit
    pub generation_method: String,
    pub provider: String,
    pub model: String,
    /// Fingerprint of the normalized request
    pub fingerprint: String,
}

/// Everything returned to the caller for one request
#[derive(Debug, Clone)]
pub struct ItineraryResult {
    pub itinerary: ItineraryResponse,
    pub quality: QualityReport,
    pub metrics: PerformanceMetrics,
    /// Non-fatal observations (budget recommendations, quality penalties)
    pub warnings: Vec<String>,
    pub metadata: ResultMetadata,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives generation requests through the full pipeline.
///
/// Safe to share across concurrent requests; all mutable state lives in
/// the queue, the breaker, the cache, and the metrics collector, each of
/// which handles its own synchronization.
pub struct ItineraryOrchestrator {
    config: Config,
    provider: SharedProvider,
    fallback: Option<SharedProvider>,
    queue: SharedQueue,
    breakers: BreakerRegistry,
    breaker: Arc<CircuitBreaker>,
    retry: RetryManager,
    validator: ResponseValidator,
    optimizer: BudgetOptimizer,
    scorer: QualityScorer,
    cache: ResponseCache,
    metrics: SharedMetrics,
}

impl ItineraryOrchestrator {
    /// Build the pipeline from configuration, constructing the provider
    /// named there
    pub fn new(config: Config) -> Result<Self> {
        let provider = create_provider(&config.provider)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Build the pipeline around an existing provider (used by tests to
    /// inject doubles)
    pub fn with_provider(config: Config, provider: SharedProvider) -> Self {
        let queue = RequestQueue::shared(config.rate_limit.clone());
        let breakers = BreakerRegistry::new(config.circuit_breaker.clone());
        let breaker = breakers.get_or_create(provider.name());
        let cache = ResponseCache::new(&config.cache);

        Self {
            provider,
            fallback: None,
            queue,
            breakers,
            breaker,
            retry: RetryManager::new(),
            validator: ResponseValidator::new(),
            optimizer: BudgetOptimizer::new(),
            scorer: QualityScorer::new(),
            cache,
            metrics: MetricsCollector::shared(),
            config,
        }
    }

    /// Configure a fallback provider used when the breaker is open or
    /// the primary call fails
    pub fn with_fallback_provider(mut self, fallback: SharedProvider) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Single public entry point
    pub async fn generate_itinerary(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<ItineraryResult> {
        self.generate_itinerary_with_cancel(request, options, &CancellationToken::new())
            .await
    }

    /// Entry point with caller-controlled cancellation
    pub async fn generate_itinerary_with_cancel(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<ItineraryResult> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "generate_itinerary",
            %request_id,
            destination = %request.destination
        );

        let result = self
            .run_pipeline(request, options, cancel)
            .instrument(span)
            .await;

        match &result {
            Ok(outcome) => {
                self.metrics.record_request(&outcome.metrics);
                self.enter(PipelineState::Done);
            }
            Err(e) => {
                self.metrics.record_failure();
                self.enter(PipelineState::Failed);
                error!(destination = %request.destination, error = %e, "Generation failed");
            }
        }

        result
    }

    async fn run_pipeline(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<ItineraryResult> {
        let start = Instant::now();
        let fingerprint = request.fingerprint();
        let use_cache = options.use_cache && self.config.cache.enabled;

        // ---- CACHE_LOOKUP --------------------------------------------------
        self.enter(PipelineState::CacheLookup);
        if use_cache
            && let Some(cached) = self.cache.get(&fingerprint)
        {
            info!(
                destination = %request.destination,
                fingerprint = %fingerprint,
                "Serving itinerary from cache"
            );
            return Ok(ItineraryResult {
                itinerary: cached.itinerary,
                quality: cached.quality,
                metrics: PerformanceMetrics::cache_hit(start.elapsed().as_millis() as u64),
                warnings: Vec::new(),
                metadata: ResultMetadata {
                    generation_method: "cache".to_string(),
                    provider: self.provider.name().to_string(),
                    model: self.provider.model().to_string(),
                    fingerprint,
                },
            });
        }

        // ---- GENERATING ----------------------------------------------------
        self.enter(PipelineState::Generating);
        let generation_start = Instant::now();
        let completion = self.generate(request, options, cancel).await?;
        let generation_ms = generation_start.elapsed().as_millis() as u64;
        self.metrics.record_provider_call(&completion.usage);

        // ---- VALIDATING ----------------------------------------------------
        self.enter(PipelineState::Validating);
        let validation_start = Instant::now();
        let itinerary = self.validator.validate(&completion.text)?;
        let validation_ms = validation_start.elapsed().as_millis() as u64;

        // ---- OPTIMIZING ----------------------------------------------------
        self.enter(PipelineState::Optimizing);
        let mut warnings = Vec::new();
        let mut optimization_tags = Vec::new();

        let assessment = self.optimizer.validate_budget(request);
        warnings.extend(assessment.recommendations.iter().cloned());

        let itinerary = if assessment.needs_optimization() {
            let (optimized, tags) = self
                .optimizer
                .optimize_itinerary(itinerary, request.budget.amount);
            optimization_tags = tags;
            optimized
        } else {
            itinerary
        };

        // Scoring runs unconditionally
        let quality = self.scorer.score(&itinerary, request);
        warnings.extend(quality.penalties.iter().cloned());

        // ---- CACHING -------------------------------------------------------
        if cancel.is_cancelled() {
            // A cancelled request must not populate the cache
            return Err(TripError::Cancelled);
        }
        if use_cache {
            self.enter(PipelineState::Caching);
            self.cache
                .put(fingerprint.clone(), itinerary.clone(), quality.clone());
        }

        Ok(ItineraryResult {
            itinerary,
            quality,
            metrics: PerformanceMetrics {
                total_ms: start.elapsed().as_millis() as u64,
                cache_hit: false,
                generation_ms,
                validation_ms,
                optimization_tags,
            },
            warnings,
            metadata: ResultMetadata {
                generation_method: "ai".to_string(),
                provider: completion.metadata.provider,
                model: completion.metadata.model,
                fingerprint,
            },
        })
    }

    /// The generation phase: retry around (queue -> breaker -> provider),
    /// all bounded by the end-to-end generation timeout
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let builder = PromptBuilder::new(request).quick(options.prioritize_speed);
        let prompt = Arc::new(builder.build());
        let params = Arc::new(builder.params(
            &self.config.generation,
            options,
            self.config.provider.attempt_timeout(),
        ));

        debug!(
            quick = options.prioritize_speed,
            max_tokens = params.max_tokens,
            "Built generation prompt"
        );

        let e2e_timeout = self.config.generation.timeout().min(options.max_timeout);

        with_timeout(
            e2e_timeout,
            self.retry.execute("itinerary generation", cancel, |_attempt| {
                let queue = Arc::clone(&self.queue);
                let breaker = Arc::clone(&self.breaker);
                let provider = Arc::clone(&self.provider);
                let fallback = self.fallback.clone();
                let prompt = Arc::clone(&prompt);
                let params = Arc::clone(&params);

                async move {
                    queue
                        .submit(attempt_once(breaker, provider, fallback, prompt, params))
                        .await
                }
            }),
            "generation phase",
        )
        .await
    }

    /// Provider health, for readiness probes
    pub async fn health_check(&self) -> Result<bool> {
        self.provider.health_check().await
    }

    /// Aggregate counters across all requests served so far
    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// State of the breaker guarding the primary provider
    pub fn breaker_stats(&self) -> crate::ai::provider::CircuitBreakerStats {
        self.breaker.stats()
    }

    /// State of every registered breaker, for monitoring
    pub fn all_breaker_stats(&self) -> Vec<crate::ai::provider::CircuitBreakerStats> {
        self.breakers.stats()
    }

    fn enter(&self, state: PipelineState) {
        debug!(state = %state, "Pipeline state");
    }
}

/// One queue-slot's worth of work: a breaker-guarded provider call with
/// optional fallback routing. Owned values only, since the queue runs it
/// on its drain task.
async fn attempt_once(
    breaker: Arc<CircuitBreaker>,
    provider: SharedProvider,
    fallback: Option<SharedProvider>,
    prompt: Arc<crate::ai::prompt::Prompt>,
    params: Arc<GenerationParams>,
) -> Result<Completion> {
    let primary = {
        let provider = Arc::clone(&provider);
        let prompt = Arc::clone(&prompt);
        let params = Arc::clone(&params);
        move || async move { provider.complete(&prompt, &params).await }
    };

    match fallback {
        Some(fallback_provider) => {
            let fallback_call = move || async move { fallback_provider.complete(&prompt, &params).await };
            breaker.execute(primary, Some(fallback_call)).await
        }
        None => breaker.guard(primary).await,
    }
}
