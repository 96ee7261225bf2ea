//! Generated Itinerary Data Model
//!
//! The structured payload the model is asked to produce. Field names match
//! the JSON schema embedded in the generation prompt, so the validated
//! response deserializes straight into these types.
//!
//! Invariants (enforced by the validator, relied on downstream):
//! - every day's activities are chronologically ordered
//! - coordinates are either both zero (unknown) or a valid lat/lng pair

use serde::{Deserialize, Serialize};

/// Category of a scheduled activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Sightseeing,
    Museum,
    Restaurant,
    Outdoor,
    Shopping,
    Entertainment,
    Relaxation,
    Transport,
    Accommodation,
}

impl ActivityType {
    /// All accepted wire values, for validation error messages
    pub const ALL: [&'static str; 9] = [
        "sightseeing",
        "museum",
        "restaurant",
        "outdoor",
        "shopping",
        "entertainment",
        "relaxation",
        "transport",
        "accommodation",
    ];

    /// Essential items are never rescaled or removed by budget optimization
    pub fn is_essential(&self) -> bool {
        matches!(self, Self::Transport | Self::Accommodation)
    }
}

/// A named place with optional resolved coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

impl Location {
    /// Both-zero coordinates mean "unresolved", by convention
    pub fn is_unresolved(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// Valid range check; unresolved (0,0) pairs also count as valid
    pub fn in_valid_range(&self) -> bool {
        self.is_unresolved()
            || ((-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng))
    }
}

/// One scheduled activity in a day plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Start time as "HH:MM" (24h)
    pub time: String,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub location: Location,
    /// Estimated price per party, in the itinerary currency
    #[serde(default)]
    pub price: f64,
    /// Expected duration in minutes
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility_notes: Option<String>,
}

impl Activity {
    /// Parse the "HH:MM" slot into minutes since midnight
    pub fn time_minutes(&self) -> Option<u32> {
        let (h, m) = self.time.split_once(':')?;
        let hours: u32 = h.parse().ok()?;
        let minutes: u32 = m.parse().ok()?;
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(hours * 60 + minutes)
    }
}

/// All activities planned for a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based day index within the trip
    pub day: u32,
    pub activities: Vec<Activity>,
}

/// Estimated spend by category
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    pub accommodation: f64,
    pub food: f64,
    pub activities: f64,
    pub transport: f64,
    #[serde(default)]
    pub misc: f64,
}

impl BudgetBreakdown {
    pub fn total(&self) -> f64 {
        self.accommodation + self.food + self.activities + self.transport + self.misc
    }
}

/// Overall budget estimate attached to an itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEstimate {
    pub total: f64,
    pub currency: String,
    pub breakdown: BudgetBreakdown,
}

/// Emergency information block. Required; never removed by optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyInfo {
    pub emergency_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A complete generated itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryResponse {
    pub destination: String,
    pub duration_days: u32,
    pub days: Vec<DayPlan>,
    pub budget: BudgetEstimate,
    #[serde(default)]
    pub general_tips: Vec<String>,
    pub emergency_info: EmergencyInfo,
}

impl ItineraryResponse {
    /// Total activity count across all days
    pub fn activity_count(&self) -> usize {
        self.days.iter().map(|d| d.activities.len()).sum()
    }

    /// Mean activities per day; 0.0 for an empty itinerary
    pub fn avg_activities_per_day(&self) -> f64 {
        if self.days.is_empty() {
            return 0.0;
        }
        self.activity_count() as f64 / self.days.len() as f64
    }

    /// True if any activity still carries unresolved (0,0) coordinates
    pub fn has_unresolved_coordinates(&self) -> bool {
        self.days
            .iter()
            .flat_map(|d| &d.activities)
            .any(|a| a.location.is_unresolved())
    }
}
