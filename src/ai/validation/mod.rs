//! Model Response Validation
//!
//! Turns raw model text into a typed, trusted [`ItineraryResponse`]:
//!
//! 1. Strip markdown fences and locate the first balanced JSON object
//! 2. Parse with serde; a syntax error fails validation outright -
//!    malformed output is never repaired or guessed at
//! 3. Structural check collecting every violated field path
//! 4. Typed deserialization into the itinerary model
//!
//! Failures carry the field paths and a short preview of the offending
//! raw text so prompt regressions can be diagnosed from logs alone.

mod extract;
mod schema;

pub use extract::{extract_object, strip_code_fences};
pub use schema::{SchemaChecker, SchemaIssue};

use tracing::debug;

use crate::types::{ItineraryResponse, Result, TripError};

/// Validates raw completions into typed itineraries
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// Full validation pipeline: extract, parse, check, deserialize
    pub fn validate(&self, raw: &str) -> Result<ItineraryResponse> {
        let cleaned = strip_code_fences(raw);
        let span = extract_object(cleaned)?;

        let value: serde_json::Value = serde_json::from_str(span)
            .map_err(|e| TripError::validation(format!("invalid JSON: {}", e), vec![], raw))?;

        let issues = SchemaChecker::new().check(&value);
        if !issues.is_empty() {
            let paths = issues.iter().map(|i| i.path.clone()).collect();
            let detail = issues
                .iter()
                .map(|i| format!("{}: {}", i.path, i.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TripError::validation(
                format!("schema validation failed ({} issues): {}", issues.len(), detail),
                paths,
                raw,
            ));
        }

        let itinerary: ItineraryResponse = serde_json::from_value(value).map_err(|e| {
            TripError::validation(format!("deserialization failed: {}", e), vec![], raw)
        })?;

        debug!(
            destination = %itinerary.destination,
            days = itinerary.days.len(),
            activities = itinerary.activity_count(),
            "Response validated"
        );

        Ok(itinerary)
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "destination": "Paris",
        "duration_days": 1,
        "days": [{
            "day": 1,
            "activities": [{
                "time": "09:00",
                "name": "Louvre",
                "type": "museum",
                "location": {"name": "Louvre", "lat": 48.86, "lng": 2.34},
                "price": 17.0,
                "duration_minutes": 180
            }]
        }],
        "budget": {
            "total": 500.0,
            "currency": "USD",
            "breakdown": {
                "accommodation": 200.0, "food": 150.0,
                "activities": 100.0, "transport": 50.0, "misc": 0.0
            }
        },
        "general_tips": ["Book ahead"],
        "emergency_info": {"emergency_number": "112"}
    }"#;

    #[test]
    fn test_clean_json_validates() {
        let itinerary = ResponseValidator::new().validate(VALID).unwrap();
        assert_eq!(itinerary.destination, "Paris");
        assert_eq!(itinerary.activity_count(), 1);
    }

    #[test]
    fn test_fenced_json_with_prose_validates() {
        let raw = format!("Here is the plan:\n```json\n{}\n```\nHave fun!", VALID);
        let itinerary = ResponseValidator::new().validate(&raw).unwrap();
        assert_eq!(itinerary.destination, "Paris");
    }

    #[test]
    fn test_truncated_json_fails_without_repair() {
        // Drop the closing brace; strict validation must reject this
        let truncated = &VALID[..VALID.len() - 1];
        let err = ResponseValidator::new().validate(truncated).unwrap_err();
        assert!(matches!(err, TripError::Validation { .. }));
    }

    #[test]
    fn test_schema_failure_reports_field_paths() {
        let raw = VALID.replace("\"museum\"", "\"skydiving\"");
        let err = ResponseValidator::new().validate(&raw).unwrap_err();
        match err {
            TripError::Validation {
                field_paths,
                raw_preview,
                ..
            } => {
                assert_eq!(field_paths, vec!["days[0].activities[0].type"]);
                assert!(raw_preview.is_some());
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_carries_preview() {
        let err = ResponseValidator::new()
            .validate("{\"destination\": }")
            .unwrap_err();
        match err {
            TripError::Validation {
                message,
                raw_preview,
                ..
            } => {
                assert!(message.contains("invalid JSON"));
                assert!(raw_preview.unwrap().contains("destination"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
