//! Budget Validation and Itinerary Optimization
//!
//! Two responsibilities:
//!
//! - `validate_budget`: compares the declared budget against a heuristic
//!   "typical" cost for the destination, accommodation tier, and party
//!   size, and produces recommendations when they diverge
//! - `optimize_itinerary`: when the declared budget is more than 20% below
//!   the itinerary's projected cost, proportionally rescales discretionary
//!   spending (food, non-essential activities, misc) toward the target.
//!   Accommodation, transport, and the emergency info block are never
//!   touched or removed.

use tracing::{debug, info};

use crate::constants::budget as budget_constants;
use crate::types::{AccommodationTier, GenerationRequest, ItineraryResponse};

/// Daily per-adult baseline cost by destination class, in USD-equivalent
const EXPENSIVE_DAILY_BASE: f64 = 220.0;
const MODERATE_DAILY_BASE: f64 = 130.0;
const BUDGET_DAILY_BASE: f64 = 70.0;

/// Destinations known to run well above the moderate baseline
const EXPENSIVE_DESTINATIONS: &[&str] = &[
    "paris", "london", "tokyo", "new york", "zurich", "geneva", "dubai", "singapore", "sydney",
    "copenhagen", "oslo", "reykjavik",
];

/// Destinations known to run well below the moderate baseline
const BUDGET_DESTINATIONS: &[&str] = &[
    "bangkok", "hanoi", "bali", "mexico city", "lisbon", "budapest", "krakow", "istanbul",
    "marrakech",
];

/// Outcome of comparing a declared budget to the heuristic estimate
#[derive(Debug, Clone)]
pub struct BudgetAssessment {
    /// Whether the declared budget plausibly covers the trip
    pub is_realistic: bool,
    /// Signed gap: (declared - realistic) / realistic. Negative means the
    /// declared budget is below the heuristic estimate.
    pub difference_percentage: f64,
    /// Heuristic realistic total for the requested trip
    pub realistic_total: f64,
    /// Human-readable suggestions when the budget looks off
    pub recommendations: Vec<String>,
}

impl BudgetAssessment {
    /// Whether the gap is wide enough to warrant rescaling the itinerary
    pub fn needs_optimization(&self) -> bool {
        self.difference_percentage < budget_constants::OPTIMIZE_GAP_THRESHOLD
    }
}

/// Validates budgets and rescales itineraries toward a target
pub struct BudgetOptimizer;

impl BudgetOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// Compare the declared budget to a heuristic realistic estimate
    pub fn validate_budget(&self, request: &GenerationRequest) -> BudgetAssessment {
        let daily_base = destination_daily_base(&request.destination);
        let tier_multiplier = request.accommodation.cost_multiplier();
        // Children are budgeted at half an adult's rate
        let party_weight =
            request.travelers.adults as f64 + 0.5 * request.travelers.children as f64;

        let realistic_total =
            daily_base * tier_multiplier * party_weight * request.duration_days() as f64;
        let difference_percentage = (request.budget.amount - realistic_total) / realistic_total;

        let mut recommendations = Vec::new();
        if difference_percentage < budget_constants::OPTIMIZE_GAP_THRESHOLD {
            recommendations.push(format!(
                "Declared budget is {:.0}% below a typical {} trip at this tier",
                -difference_percentage * 100.0,
                request.destination
            ));
            if request.accommodation != AccommodationTier::Budget {
                recommendations
                    .push("Consider budget-tier accommodation to close the gap".to_string());
            }
            if request.duration_days() > 2 {
                recommendations.push("Consider shortening the trip by a day".to_string());
            }
        } else if difference_percentage > 0.5 {
            recommendations
                .push("Budget comfortably exceeds typical costs; room to upgrade".to_string());
        }

        let is_realistic = difference_percentage >= budget_constants::OPTIMIZE_GAP_THRESHOLD;

        debug!(
            destination = %request.destination,
            declared = request.budget.amount,
            realistic = realistic_total,
            gap_pct = difference_percentage * 100.0,
            is_realistic,
            "Budget validated"
        );

        BudgetAssessment {
            is_realistic,
            difference_percentage,
            realistic_total,
            recommendations,
        }
    }

    /// Rescale discretionary spending toward `target_budget`.
    ///
    /// Essential line items (accommodation, transport) and the emergency
    /// info block are preserved as-is. Discretionary categories and
    /// non-essential activity prices are scaled by a common factor,
    /// floored so the itinerary never collapses to token amounts.
    ///
    /// Returns the optimized itinerary and the optimization tags applied.
    pub fn optimize_itinerary(
        &self,
        mut itinerary: ItineraryResponse,
        target_budget: f64,
    ) -> (ItineraryResponse, Vec<String>) {
        let breakdown = &itinerary.budget.breakdown;
        let fixed = breakdown.accommodation + breakdown.transport;
        let discretionary = breakdown.food + breakdown.activities + breakdown.misc;

        if discretionary <= 0.0 {
            return (itinerary, Vec::new());
        }

        let wanted = (target_budget - fixed).max(0.0);
        let scale = (wanted / discretionary).clamp(budget_constants::MIN_SCALE_FACTOR, 1.0);

        if (scale - 1.0).abs() < f64::EPSILON {
            return (itinerary, Vec::new());
        }

        let breakdown = &mut itinerary.budget.breakdown;
        breakdown.food = round2(breakdown.food * scale);
        breakdown.activities = round2(breakdown.activities * scale);
        breakdown.misc = round2(breakdown.misc * scale);
        itinerary.budget.total = round2(breakdown.total());

        for day in &mut itinerary.days {
            for activity in &mut day.activities {
                if !activity.activity_type.is_essential() {
                    activity.price = round2(activity.price * scale);
                }
            }
        }

        info!(
            target = target_budget,
            projected = itinerary.budget.total,
            scale,
            "Itinerary rescaled toward declared budget"
        );

        let mut tags = vec![format!("discretionary_rescale:{:.2}", scale)];
        let deviation = (itinerary.budget.total - target_budget).abs() / target_budget;
        if deviation > budget_constants::CONVERGENCE_TOLERANCE {
            tags.push("rescale_floor_reached".to_string());
        }

        (itinerary, tags)
    }
}

impl Default for BudgetOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

fn destination_daily_base(destination: &str) -> f64 {
    let lower = destination.to_lowercase();
    if EXPENSIVE_DESTINATIONS.iter().any(|d| lower.contains(d)) {
        EXPENSIVE_DAILY_BASE
    } else if BUDGET_DESTINATIONS.iter().any(|d| lower.contains(d)) {
        BUDGET_DAILY_BASE
    } else {
        MODERATE_DAILY_BASE
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Activity, ActivityType, Budget, BudgetBreakdown, BudgetEstimate, DayPlan, EmergencyInfo,
        Location, Travelers,
    };
    use chrono::NaiveDate;

    fn request(destination: &str, amount: f64, days: u32) -> GenerationRequest {
        GenerationRequest {
            destination: destination.to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new((days - 1) as u64))
                .unwrap(),
            budget: Budget {
                amount,
                currency: "USD".to_string(),
            },
            travelers: Travelers {
                adults: 2,
                children: 0,
            },
            interests: vec![],
            accommodation: AccommodationTier::MidRange,
            transport: Default::default(),
            pace: Default::default(),
            dietary_restrictions: vec![],
            accessibility_required: false,
        }
    }

    fn itinerary(total: f64) -> ItineraryResponse {
        // Fixed half, discretionary half
        let accommodation = total * 0.40;
        let transport = total * 0.10;
        let food = total * 0.25;
        let activities = total * 0.20;
        let misc = total * 0.05;
        ItineraryResponse {
            destination: "Paris".to_string(),
            duration_days: 1,
            days: vec![DayPlan {
                day: 1,
                activities: vec![
                    Activity {
                        time: "09:00".to_string(),
                        name: "Museum".to_string(),
                        activity_type: ActivityType::Museum,
                        location: Location {
                            name: "Museum".to_string(),
                            lat: 48.86,
                            lng: 2.34,
                        },
                        price: 50.0,
                        duration_minutes: 120,
                        accessibility_notes: None,
                    },
                    Activity {
                        time: "18:00".to_string(),
                        name: "Airport transfer".to_string(),
                        activity_type: ActivityType::Transport,
                        location: Location {
                            name: "CDG".to_string(),
                            lat: 49.0,
                            lng: 2.55,
                        },
                        price: 60.0,
                        duration_minutes: 45,
                        accessibility_notes: None,
                    },
                ],
            }],
            budget: BudgetEstimate {
                total,
                currency: "USD".to_string(),
                breakdown: BudgetBreakdown {
                    accommodation,
                    food,
                    activities,
                    transport,
                    misc,
                },
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
    fn test_realistic_budget_passes() {
        // Paris, mid-range, 2 adults, 3 days: 220 * 1.0 * 2 * 3 = 1320
        let assessment = BudgetOptimizer::new().validate_budget(&request("Paris", 1400.0, 3));
        assert!(assessment.is_realistic);
        assert!(!assessment.needs_optimization());
    }

    #[test]
    fn test_underfunded_budget_flagged_with_recommendations() {
        let assessment = BudgetOptimizer::new().validate_budget(&request("Paris", 500.0, 3));
        assert!(!assessment.is_realistic);
        assert!(assessment.needs_optimization());
        assert!(assessment.difference_percentage < -0.2);
        assert!(!assessment.recommendations.is_empty());
    }

    #[test]
    fn test_destination_class_affects_estimate() {
        let optimizer = BudgetOptimizer::new();
        let paris = optimizer.validate_budget(&request("Paris, France", 800.0, 2));
        let hanoi = optimizer.validate_budget(&request("Hanoi, Vietnam", 800.0, 2));
        assert!(hanoi.realistic_total < paris.realistic_total);
    }

    #[test]
    fn test_optimize_converges_within_tolerance() {
        // Target 40% below projected: 1000 -> 600
        let (optimized, tags) = BudgetOptimizer::new().optimize_itinerary(itinerary(1000.0), 600.0);

        let deviation = (optimized.budget.total - 600.0).abs() / 600.0;
        assert!(
            deviation <= budget_constants::CONVERGENCE_TOLERANCE,
            "projected {} not within 10% of 600",
            optimized.budget.total
        );
        assert!(!tags.is_empty());
    }

    #[test]
    fn test_optimize_preserves_essential_items() {
        let original = itinerary(1000.0);
        let original_accommodation = original.budget.breakdown.accommodation;
        let original_transport_price = original.days[0].activities[1].price;

        let (optimized, _) = BudgetOptimizer::new().optimize_itinerary(original, 600.0);

        assert_eq!(
            optimized.budget.breakdown.accommodation,
            original_accommodation
        );
        assert_eq!(optimized.days[0].activities[1].price, original_transport_price);
        // Emergency info never removed
        assert_eq!(optimized.emergency_info.emergency_number, "112");
        // Discretionary activity was rescaled down
        assert!(optimized.days[0].activities[0].price < 50.0);
    }

    #[test]
    fn test_scale_floor_prevents_collapse() {
        // Absurdly low target: scale clamps at 0.25 instead of zeroing out
        let (optimized, tags) = BudgetOptimizer::new().optimize_itinerary(itinerary(1000.0), 100.0);

        let discretionary = optimized.budget.breakdown.food
            + optimized.budget.breakdown.activities
            + optimized.budget.breakdown.misc;
        assert!((discretionary - 500.0 * 0.25).abs() < 1.0);
        assert!(tags.iter().any(|t| t == "rescale_floor_reached"));
    }

    #[test]
    fn test_no_rescale_when_target_already_met() {
        let (optimized, tags) = BudgetOptimizer::new().optimize_itinerary(itinerary(1000.0), 1200.0);
        assert!((optimized.budget.total - 1000.0).abs() < f64::EPSILON);
        assert!(tags.is_empty());
    }
}
