//! Itinerary Prompt Builder
//!
//! Converts a structured trip request into a model prompt (system + user
//! segments) and generation parameters. Two paths exist:
//!
//! - **full**: complete schema, detailed planning instructions
//! - **quick**: condensed schema and low token cap, used when the caller
//!   prioritizes speed over completeness

use std::time::Duration;

use crate::config::GenerationSettings;
use crate::types::{AccommodationTier, GenerationOptions, GenerationRequest, TravelPace};

use super::provider::GenerationParams;

/// A system + user prompt pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// JSON schema skeleton embedded in the system segment. The validator
/// enforces the same shape on the way back.
const ITINERARY_SCHEMA: &str = r#"{
  "destination": "string",
  "duration_days": 3,
  "days": [
    {
      "day": 1,
      "activities": [
        {
          "time": "09:00",
          "name": "string",
          "type": "sightseeing|museum|restaurant|outdoor|shopping|entertainment|relaxation|transport|accommodation",
          "location": {"name": "string", "lat": 0.0, "lng": 0.0},
          "price": 0.0,
          "duration_minutes": 60,
          "accessibility_notes": "string (optional)"
        }
      ]
    }
  ],
  "budget": {
    "total": 0.0,
    "currency": "USD",
    "breakdown": {"accommodation": 0.0, "food": 0.0, "activities": 0.0, "transport": 0.0, "misc": 0.0}
  },
  "general_tips": ["string"],
  "emergency_info": {"emergency_number": "string", "hospital": "string (optional)", "notes": "string (optional)"}
}"#;

/// Builds prompts and generation parameters for itinerary requests
pub struct PromptBuilder<'a> {
    request: &'a GenerationRequest,
    quick: bool,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(request: &'a GenerationRequest) -> Self {
        Self {
            request,
            quick: false,
        }
    }

    /// Switch to the low-token quick path
    pub fn quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    /// Build the system + user prompt pair
    pub fn build(&self) -> Prompt {
        Prompt {
            system: self.system_segment(),
            user: self.user_segment(),
        }
    }

    /// Generation parameters matching the chosen path
    pub fn params(
        &self,
        settings: &GenerationSettings,
        options: &GenerationOptions,
        attempt_timeout: Duration,
    ) -> GenerationParams {
        GenerationParams {
            max_tokens: if self.quick {
                settings.quick_max_tokens
            } else {
                settings.max_tokens
            },
            temperature: settings.temperature,
            timeout: attempt_timeout.min(options.max_timeout),
            model: options.model.clone(),
        }
    }

    fn system_segment(&self) -> String {
        let mut system = String::new();

        system.push_str(
            "You are an expert travel planner. Produce a realistic, day-by-day \
             itinerary for the trip described by the user.\n\n",
        );
        system.push_str("Respond ONLY with valid JSON matching this schema, no explanation:\n\n");
        system.push_str("```json\n");
        system.push_str(ITINERARY_SCHEMA);
        system.push_str("\n```\n\n");

        if self.quick {
            system.push_str(
                "Keep it brief: 2-3 activities per day, one-line names, \
                 omit optional fields. Speed matters more than detail.\n",
            );
        } else {
            system.push_str(
                "Rules:\n\
                 - Order each day's activities chronologically by start time.\n\
                 - Use real coordinates when you know them; use lat 0 and lng 0 when you do not. \
                   Never invent coordinates.\n\
                 - Prices are per travel party in the requested currency.\n\
                 - Include at least one restaurant per day and realistic transit gaps.\n\
                 - The budget breakdown must sum to the budget total.\n\
                 - Always include the emergency_info block for the destination country.\n",
            );
        }

        system
    }

    fn user_segment(&self) -> String {
        let req = self.request;
        let mut user = String::new();

        user.push_str(&format!("Destination: {}\n", req.destination));
        user.push_str(&format!(
            "Dates: {} to {} ({} days)\n",
            req.start_date,
            req.end_date,
            req.duration_days()
        ));
        user.push_str(&format!(
            "Budget: {:.2} {} total\n",
            req.budget.amount, req.budget.currency
        ));
        user.push_str(&format!(
            "Travelers: {} adult(s), {} child(ren)\n",
            req.travelers.adults, req.travelers.children
        ));

        if !req.interests.is_empty() {
            user.push_str(&format!("Interests: {}\n", req.interests.join(", ")));
        }

        user.push_str(&format!(
            "Accommodation: {}\n",
            match req.accommodation {
                AccommodationTier::Budget => "budget",
                AccommodationTier::MidRange => "mid-range",
                AccommodationTier::Luxury => "luxury",
            }
        ));

        user.push_str(&format!(
            "Pace: {}\n",
            match req.pace {
                TravelPace::Relaxed => "relaxed (2-3 activities/day)",
                TravelPace::Moderate => "moderate (3-5 activities/day)",
                TravelPace::Packed => "packed (5-7 activities/day)",
            }
        ));

        if !req.dietary_restrictions.is_empty() {
            user.push_str(&format!(
                "Dietary restrictions: {}\n",
                req.dietary_restrictions.join(", ")
            ));
        }

        if req.accessibility_required {
            user.push_str(
                "Accessibility: wheelchair accessible venues only; \
                 include accessibility_notes per activity\n",
            );
        }

        user
    }
}
