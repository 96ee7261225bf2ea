//! Trip Generation Request
//!
//! The immutable, caller-owned description of a trip to plan.
//! The cache fingerprint is a stable sha256 over the normalized fields,
//! so semantically identical requests share a cache entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::constants::generation as gen_constants;

/// Accommodation preference tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccommodationTier {
    Budget,
    #[default]
    MidRange,
    Luxury,
}

impl AccommodationTier {
    /// Cost multiplier relative to the mid-range baseline
    pub fn cost_multiplier(&self) -> f64 {
        match self {
            Self::Budget => 0.6,
            Self::MidRange => 1.0,
            Self::Luxury => 2.2,
        }
    }
}

/// Preferred mode of getting around at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walking,
    #[default]
    PublicTransit,
    RentalCar,
    Rideshare,
}

/// Trip pacing preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TravelPace {
    Relaxed,
    #[default]
    Moderate,
    Packed,
}

/// Traveler headcount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travelers {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
}

impl Default for Travelers {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
        }
    }
}

impl Travelers {
    pub fn total(&self) -> u32 {
        self.adults + self.children
    }
}

/// Declared trip budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Total amount for the whole trip
    pub amount: f64,
    /// ISO 4217 currency code
    pub currency: String,
}

/// A structured trip-planning request.
///
/// Immutable once submitted; the orchestrator borrows it read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-form destination, e.g. "Paris, France"
    pub destination: String,
    /// First day of the trip (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the trip (inclusive)
    pub end_date: NaiveDate,
    pub budget: Budget,
    #[serde(default)]
    pub travelers: Travelers,
    /// Interest tags such as "culture" or "food"
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub accommodation: AccommodationTier,
    #[serde(default)]
    pub transport: TransportMode,
    #[serde(default)]
    pub pace: TravelPace,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub accessibility_required: bool,
}

impl GenerationRequest {
    /// Trip length in days, inclusive of both endpoints. Never less than 1.
    pub fn duration_days(&self) -> u32 {
        let days = (self.end_date - self.start_date).num_days() + 1;
        days.max(1) as u32
    }

    /// Stable cache fingerprint derived from the normalized fields.
    ///
    /// Whitespace, letter case, and interest ordering do not affect the
    /// fingerprint; dates and budget do.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.destination.trim().to_lowercase().as_bytes());
        hasher.update(self.start_date.to_string().as_bytes());
        hasher.update(self.end_date.to_string().as_bytes());
        hasher.update(format!("{:.2}", self.budget.amount).as_bytes());
        hasher.update(self.budget.currency.trim().to_uppercase().as_bytes());
        hasher.update(self.travelers.adults.to_le_bytes());
        hasher.update(self.travelers.children.to_le_bytes());

        let mut interests: Vec<String> = self
            .interests
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect();
        interests.sort();
        interests.dedup();
        for interest in &interests {
            hasher.update(interest.as_bytes());
            hasher.update(b"|");
        }

        let mut dietary: Vec<String> = self
            .dietary_restrictions
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        dietary.sort();
        dietary.dedup();
        for item in &dietary {
            hasher.update(item.as_bytes());
            hasher.update(b"|");
        }

        hasher.update([
            self.accommodation as u8,
            self.transport as u8,
            self.pace as u8,
            self.accessibility_required as u8,
        ]);

        format!("{:x}", hasher.finalize())
    }
}

/// Per-call knobs supplied alongside a request. Never persisted.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Consult and populate the response cache
    pub use_cache: bool,
    /// End-to-end deadline for the generation phase
    pub max_timeout: Duration,
    /// Use the low-token quick prompt path
    pub prioritize_speed: bool,
    /// Override the configured model identifier
    pub model: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            max_timeout: Duration::from_secs(gen_constants::DEFAULT_TIMEOUT_SECS),
            prioritize_speed: false,
            model: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            destination: "Paris, France".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 9, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            budget: Budget {
                amount: 900.0,
                currency: "USD".to_string(),
            },
            travelers: Travelers::default(),
            interests: vec!["culture".to_string(), "food".to_string()],
            accommodation: AccommodationTier::MidRange,
            transport: TransportMode::PublicTransit,
            pace: TravelPace::Moderate,
            dietary_restrictions: vec![],
            accessibility_required: false,
        }
    }

    #[test]
    fn test_duration_inclusive() {
        assert_eq!(request().duration_days(), 3);
    }

    #[test]
    fn test_fingerprint_stable() {
        assert_eq!(request().fingerprint(), request().fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_case_and_interest_order() {
        let a = request();
        let mut b = request();
        b.destination = "  paris, france ".to_string();
        b.interests = vec!["Food".to_string(), "CULTURE".to_string()];
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_sensitive_to_budget() {
        let a = request();
        let mut b = request();
        b.budget.amount = 901.0;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_sensitive_to_dates() {
        let a = request();
        let mut b = request();
        b.end_date = NaiveDate::from_ymd_opt(2026, 9, 13).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_default_options() {
        let opts = GenerationOptions::default();
        assert!(opts.use_cache);
        assert!(!opts.prioritize_speed);
        assert_eq!(opts.max_timeout, Duration::from_secs(90));
    }
}
