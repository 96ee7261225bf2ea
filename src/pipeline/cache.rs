//! Response Cache
//!
//! In-memory TTL cache keyed by the request fingerprint. Only results
//! that already passed validation and scoring are stored; a raw model
//! response never enters the cache. Reads and writes are atomic per key
//! via DashMap; a write race between two identical concurrent requests
//! is acceptable (last writer wins, payloads are equivalent).

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::ai::scoring::QualityReport;
use crate::config::CacheSettings;
use crate::types::ItineraryResponse;

/// A validated, scored itinerary with its insertion time
#[derive(Debug, Clone)]
pub struct CachedItinerary {
    pub itinerary: ItineraryResponse,
    pub quality: QualityReport,
    inserted_at: Instant,
}

impl CachedItinerary {
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Fingerprint-keyed TTL cache for finished itineraries
pub struct ResponseCache {
    entries: DashMap<String, CachedItinerary>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: settings.ttl(),
            max_entries: settings.max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a fingerprint; expired entries are removed on access
    pub fn get(&self, fingerprint: &str) -> Option<CachedItinerary> {
        let expired = match self.entries.get(fingerprint) {
            Some(entry) if entry.age() <= self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint, age_secs = entry.age().as_secs(), "Cache hit");
                return Some(entry.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(fingerprint);
            debug!(fingerprint, "Cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a validated, scored result
    pub fn put(&self, fingerprint: String, itinerary: ItineraryResponse, quality: QualityReport) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&fingerprint) {
            self.evict_oldest();
        }

        self.entries.insert(
            fingerprint,
            CachedItinerary {
                itinerary,
                quality,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop the single oldest entry to make room
    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .max_by_key(|entry| entry.age())
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            info!(fingerprint = %key, "Evicted oldest cache entry (capacity reached)");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
