//! Itinerary Quality Scoring
//!
//! Coarse fitness estimate for a generated itinerary. Starts from a base
//! score and subtracts fixed penalties for observable defects:
//!
//! - unresolved (0,0) coordinates anywhere in the plan
//! - projected budget deviating more than 30% from the declared budget
//! - sparse days (average under 2 activities/day)
//! - overpacked days (average over 8 activities/day)
//!
//! The score maps to a tier (high / medium / low) and an accuracy
//! estimate that never drops below a floor, since even a rough itinerary
//! retains some value as a starting point.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::quality as quality_constants;
use crate::types::{GenerationRequest, ItineraryResponse};

/// Coarse usability classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Score, tier, and the reasons behind every deduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Final score in [0, 100]
    pub score: u32,
    pub tier: QualityTier,
    /// Accuracy estimate, floored at 50
    pub accuracy_estimate: u32,
    /// One entry per penalty applied
    pub penalties: Vec<String>,
}

/// Scores validated itineraries against the originating request
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        itinerary: &ItineraryResponse,
        request: &GenerationRequest,
    ) -> QualityReport {
        let mut score = quality_constants::BASE_SCORE as i32;
        let mut penalties = Vec::new();

        if itinerary.has_unresolved_coordinates() {
            score -= quality_constants::UNRESOLVED_COORDS_PENALTY as i32;
            penalties.push("unresolved coordinates on one or more activities".to_string());
        }

        if request.budget.amount > 0.0 {
            let deviation =
                (itinerary.budget.total - request.budget.amount).abs() / request.budget.amount;
            if deviation > 0.30 {
                score -= quality_constants::BUDGET_DEVIATION_PENALTY as i32;
                penalties.push(format!(
                    "projected budget deviates {:.0}% from declared",
                    deviation * 100.0
                ));
            }
        }

        let avg = itinerary.avg_activities_per_day();
        if avg < 2.0 {
            score -= quality_constants::SPARSE_DAYS_PENALTY as i32;
            penalties.push(format!("sparse schedule ({:.1} activities/day)", avg));
        } else if avg > 8.0 {
            score -= quality_constants::OVERPACKED_DAYS_PENALTY as i32;
            penalties.push(format!("overpacked schedule ({:.1} activities/day)", avg));
        }

        let score = score.clamp(0, quality_constants::BASE_SCORE as i32) as u32;
        let tier = if score >= quality_constants::HIGH_TIER_FLOOR {
            QualityTier::High
        } else if score >= quality_constants::MEDIUM_TIER_FLOOR {
            QualityTier::Medium
        } else {
            QualityTier::Low
        };
        let accuracy_estimate = score.max(quality_constants::ACCURACY_FLOOR);

        debug!(score, %tier, penalties = penalties.len(), "Itinerary scored");

        QualityReport {
            score,
            tier,
            accuracy_estimate,
            penalties,
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Activity, ActivityType, Budget, BudgetBreakdown, BudgetEstimate, DayPlan, EmergencyInfo,
        Location, Travelers,
    };
    use chrono::NaiveDate;

    fn request(amount: f64) -> GenerationRequest {
        GenerationRequest {
            destination: "Paris".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 3).unwrap(),
            budget: Budget {
                amount,
                currency: "USD".to_string(),
            },
            travelers: Travelers::default(),
            interests: vec![],
            accommodation: Default::default(),
            transport: Default::default(),
            pace: Default::default(),
            dietary_restrictions: vec![],
            accessibility_required: false,
        }
    }

    fn activity(resolved: bool) -> Activity {
        Activity {
            time: "09:00".to_string(),
            name: "Walk".to_string(),
            activity_type: ActivityType::Sightseeing,
            location: Location {
                name: "Center".to_string(),
                lat: if resolved { 48.86 } else { 0.0 },
                lng: if resolved { 2.34 } else { 0.0 },
            },
            price: 10.0,
            duration_minutes: 60,
            accessibility_notes: None,
        }
    }

    fn itinerary(per_day: usize, resolved: bool, total: f64) -> ItineraryResponse {
        ItineraryResponse {
            destination: "Paris".to_string(),
            duration_days: 3,
            days: (1..=3)
                .map(|day| DayPlan {
                    day,
                    activities: vec![activity(resolved); per_day],
                })
                .collect(),
            budget: BudgetEstimate {
                total,
                currency: "USD".to_string(),
                breakdown: BudgetBreakdown::default(),
            },
            general_tips: vec![],
            emergency_info: EmergencyInfo {
                emergency_number: "112".to_string(),
                hospital: None,
                notes: None,
            },
        }
    }

    #[test]
    fn test_clean_itinerary_scores_high() {
        let report = QualityScorer::new().score(&itinerary(3, true, 900.0), &request(900.0));
        assert_eq!(report.score, 100);
        assert_eq!(report.tier, QualityTier::High);
        assert!(report.penalties.is_empty());
    }

    #[test]
    fn test_unresolved_coordinates_penalized() {
        let report = QualityScorer::new().score(&itinerary(3, false, 900.0), &request(900.0));
        assert_eq!(report.score, 85);
        assert_eq!(report.tier, QualityTier::High);
        assert_eq!(report.penalties.len(), 1);
    }

    #[test]
    fn test_budget_deviation_penalized() {
        // 1400 projected vs 900 declared: 55% deviation
        let report = QualityScorer::new().score(&itinerary(3, true, 1400.0), &request(900.0));
        assert_eq!(report.score, 90);
    }

    #[test]
    fn test_sparse_days_penalized() {
        let report = QualityScorer::new().score(&itinerary(1, true, 900.0), &request(900.0));
        assert_eq!(report.score, 85);
    }

    #[test]
    fn test_overpacked_days_penalized() {
        let report = QualityScorer::new().score(&itinerary(9, true, 900.0), &request(900.0));
        assert_eq!(report.score, 90);
    }

    #[test]
    fn test_stacked_penalties_drop_tier() {
        // Unresolved (-15) + deviation (-10) + sparse (-15) = 60 -> low
        let report = QualityScorer::new().score(&itinerary(1, false, 1400.0), &request(900.0));
        assert_eq!(report.score, 60);
        assert_eq!(report.tier, QualityTier::Low);
        // Accuracy floors at 50, never below
        assert_eq!(report.accuracy_estimate, 60);
    }

    #[test]
    fn test_accuracy_floor() {
        let mut plan = itinerary(1, false, 1400.0);
        // Force an empty schedule as well: avg 0/day keeps the sparse penalty
        plan.days.iter_mut().for_each(|d| d.activities.clear());
        let report = QualityScorer::new().score(&plan, &request(900.0));
        assert!(report.accuracy_estimate >= 50);
    }
}
