//! Pipeline Metrics
//!
//! Two layers: a per-request [`PerformanceMetrics`] snapshot returned with
//! every result (produced once, never mutated afterwards), and a process-
//! wide [`MetricsCollector`] aggregating counters across requests with
//! atomics for minimal contention.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use crate::ai::provider::TokenUsage;

// =============================================================================
// Per-Request Metrics
// =============================================================================

/// Timing breakdown for a single generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// End-to-end wall-clock time in milliseconds
    pub total_ms: u64,
    /// Whether the result came from the cache
    pub cache_hit: bool,
    /// Time spent in the generation phase (queue + provider + retries)
    pub generation_ms: u64,
    /// Time spent validating the model output
    pub validation_ms: u64,
    /// Optimization tags applied during the optimizing phase
    pub optimization_tags: Vec<String>,
}

impl PerformanceMetrics {
    /// Metrics shape for a cache hit: no generation or validation time
    pub fn cache_hit(total_ms: u64) -> Self {
        Self {
            total_ms,
            cache_hit: true,
            generation_ms: 0,
            validation_ms: 0,
            optimization_tags: Vec::new(),
        }
    }
}

// =============================================================================
// Process-Wide Collector
// =============================================================================

/// Shared collector handle for concurrent pipeline invocations
pub type SharedMetrics = Arc<MetricsCollector>;

/// Thread-safe aggregate counters across all requests
pub struct MetricsCollector {
    start_time: Instant,
    requests: AtomicU32,
    cache_hits: AtomicU32,
    failures: AtomicU32,
    provider_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Snapshot of the aggregate counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub uptime_ms: u64,
    pub requests: u32,
    pub cache_hits: u32,
    pub failures: u32,
    pub provider_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub avg_latency_ms: f64,
    pub cache_hit_rate: f64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests: AtomicU32::new(0),
            cache_hits: AtomicU32::new(0),
            failures: AtomicU32::new(0),
            provider_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    pub fn shared() -> SharedMetrics {
        Arc::new(Self::new())
    }

    /// Record a finished request with its per-request metrics
    pub fn record_request(&self, metrics: &PerformanceMetrics) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if metrics.cache_hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms
            .fetch_add(metrics.total_ms, Ordering::Relaxed);
    }

    /// Record a request that ended in failure
    pub fn record_failure(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one provider round trip and its token usage
    pub fn record_provider_call(&self, usage: &TokenUsage) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens as u64, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        let requests = self.requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let completed = requests.saturating_sub(self.failures.load(Ordering::Relaxed));
        let avg_latency_ms = if completed > 0 {
            total_latency as f64 / completed as f64
        } else {
            0.0
        };
        let cache_hit_rate = if requests > 0 {
            cache_hits as f64 / requests as f64
        } else {
            0.0
        };

        MetricsSummary {
            uptime_ms: self.start_time.elapsed().as_millis() as u64,
            requests,
            cache_hits,
            failures: self.failures.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            avg_latency_ms,
            cache_hit_rate,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_requests_and_hits() {
        let collector = MetricsCollector::new();

        collector.record_request(&PerformanceMetrics {
            total_ms: 100,
            cache_hit: false,
            generation_ms: 80,
            validation_ms: 5,
            optimization_tags: vec![],
        });
        collector.record_request(&PerformanceMetrics::cache_hit(2));
        collector.record_failure();

        let summary = collector.summary();
        assert_eq!(summary.requests, 3);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.failures, 1);
        assert!((summary.cache_hit_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((summary.avg_latency_ms - 51.0).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let collector = Arc::new(MetricsCollector::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for _ in 0..100 {
                        collector.record_provider_call(&TokenUsage {
                            input_tokens: 10,
                            output_tokens: 5,
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = collector.summary();
        assert_eq!(summary.provider_calls, 800);
        assert_eq!(summary.input_tokens, 8000);
        assert_eq!(summary.output_tokens, 4000);
    }
}
