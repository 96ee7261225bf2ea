//! Scripted Provider (Deterministic Test Double)
//!
//! Stands in for the network provider in tests and offline development.
//! Calls consume a pre-loaded script of responses first; once the script is
//! empty, the provider synthesizes a schema-valid itinerary from the prompt
//! text itself, so pipeline tests exercise real validation and scoring.
//!
//! Selected once at construction time via `provider = "scripted"`; the
//! pipeline never branches on real-vs-double per call.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{Completion, CompletionMetadata, CompletionProvider, GenerationParams, TokenUsage};
use crate::ai::prompt::Prompt;
use crate::config::ProviderSettings;
use crate::types::{ProviderError, Result, TripError};

/// One pre-loaded response in the script
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this raw text as the completion payload
    Text(String),
    /// Fail with this normalized provider error
    Fail(ProviderError),
    /// Sleep past the caller's deadline, then fail as a timeout.
    /// The provider enforces `params.timeout` itself, like the real one.
    Stall,
}

/// Deterministic completion provider for tests and offline runs
pub struct ScriptedProvider {
    model: String,
    script: Mutex<VecDeque<ScriptStep>>,
    calls: AtomicU64,
}

impl std::fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("model", &self.model)
            .field("calls", &self.calls.load(Ordering::Relaxed))
            .finish()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            model: "scripted-v1".to_string(),
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            model: settings.model.clone(),
            ..Self::new()
        }
    }

    /// Queue a raw text response
    pub fn push_text(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(ScriptStep::Text(text.into()));
    }

    /// Queue a failure
    pub fn push_failure(&self, error: ProviderError) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(ScriptStep::Fail(error));
    }

    /// Queue a stall that outlives the per-attempt deadline
    pub fn push_stall(&self) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(ScriptStep::Stall);
    }

    /// Number of `complete` calls observed so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_step(&self) -> Option<ScriptStep> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &Prompt, params: &GenerationParams) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let text = match self.next_step() {
            Some(ScriptStep::Text(text)) => text,
            Some(ScriptStep::Fail(error)) => return Err(TripError::Provider(error)),
            Some(ScriptStep::Stall) => {
                tokio::time::sleep(params.timeout + Duration::from_millis(50)).await;
                return Err(TripError::Provider(
                    ProviderError::new(
                        crate::types::ProviderErrorKind::Timeout,
                        format!("request exceeded {:?} deadline", params.timeout),
                    )
                    .provider("scripted"),
                ));
            }
            None => synthesize_itinerary(prompt),
        };

        let output_tokens = (text.len() / 4) as u32;
        Ok(Completion {
            text,
            usage: TokenUsage {
                input_tokens: ((prompt.system.len() + prompt.user.len()) / 4) as u32,
                output_tokens,
            },
            elapsed: Duration::from_millis(1),
            metadata: CompletionMetadata {
                model: self.model.clone(),
                provider: "scripted".to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

// =============================================================================
// Itinerary Synthesis
// =============================================================================

/// Coordinates for destinations the double "knows"; everything else gets
/// lat/lng 0 so unresolved-coordinate handling stays exercised
const KNOWN_PLACES: &[(&str, f64, f64)] = &[
    ("paris", 48.8566, 2.3522),
    ("london", 51.5074, -0.1278),
    ("tokyo", 35.6762, 139.6503),
    ("rome", 41.9028, 12.4964),
    ("new york", 40.7128, -74.0060),
    ("barcelona", 41.3851, 2.1734),
];

/// Pull `Key: value` out of the structured user segment
fn prompt_field<'a>(user: &'a str, key: &str) -> Option<&'a str> {
    user.lines()
        .find_map(|line| line.strip_prefix(key))
        .map(str::trim)
}

fn parse_days(user: &str) -> u32 {
    // "Dates: 2026-09-10 to 2026-09-12 (3 days)"
    prompt_field(user, "Dates:")
        .and_then(|v| v.rsplit('(').next())
        .and_then(|v| v.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
        .max(1)
}

fn parse_budget(user: &str) -> (f64, String) {
    // "Budget: 900.00 USD total"
    let field = prompt_field(user, "Budget:").unwrap_or("1000.00 USD");
    let mut parts = field.split_whitespace();
    let amount = parts.next().and_then(|v| v.parse().ok()).unwrap_or(1000.0);
    let currency = parts.next().unwrap_or("USD").to_string();
    (amount, currency)
}

/// Build a schema-valid itinerary response for the requested trip
fn synthesize_itinerary(prompt: &Prompt) -> String {
    let destination = prompt_field(&prompt.user, "Destination:")
        .unwrap_or("Unknown")
        .to_string();
    let days = parse_days(&prompt.user);
    let (total, currency) = parse_budget(&prompt.user);

    let lower = destination.to_lowercase();
    let (lat, lng) = KNOWN_PLACES
        .iter()
        .find(|(name, _, _)| lower.contains(name))
        .map(|(_, lat, lng)| (*lat, *lng))
        .unwrap_or((0.0, 0.0));

    let accommodation = (total * 0.40 * 100.0).round() / 100.0;
    let food = (total * 0.25 * 100.0).round() / 100.0;
    let activities_budget = (total * 0.20 * 100.0).round() / 100.0;
    let transport = (total * 0.10 * 100.0).round() / 100.0;
    let misc = total - accommodation - food - activities_budget - transport;

    let per_day_activity = activities_budget / days as f64;
    let per_day_food = food / days as f64;

    let day_plans: Vec<_> = (1..=days)
        .map(|day| {
            json!({
                "day": day,
                "activities": [
                    {
                        "time": "09:00",
                        "name": format!("{} walking tour, day {}", destination, day),
                        "type": "sightseeing",
                        "location": {"name": format!("{} center", destination), "lat": lat, "lng": lng},
                        "price": (per_day_activity * 0.5 * 100.0).round() / 100.0,
                        "duration_minutes": 150
                    },
                    {
                        "time": "12:30",
                        "name": "Local lunch spot",
                        "type": "restaurant",
                        "location": {"name": format!("{} old town", destination), "lat": lat, "lng": lng},
                        "price": (per_day_food * 100.0).round() / 100.0,
                        "duration_minutes": 90
                    },
                    {
                        "time": "15:00",
                        "name": "City museum visit",
                        "type": "museum",
                        "location": {"name": format!("{} museum quarter", destination), "lat": lat, "lng": lng},
                        "price": (per_day_activity * 0.5 * 100.0).round() / 100.0,
                        "duration_minutes": 120
                    }
                ]
            })
        })
        .collect();

    json!({
        "destination": destination,
        "duration_days": days,
        "days": day_plans,
        "budget": {
            "total": total,
            "currency": currency,
            "breakdown": {
                "accommodation": accommodation,
                "food": food,
                "activities": activities_budget,
                "transport": transport,
                "misc": (misc * 100.0).round() / 100.0
            }
        },
        "general_tips": [
            "Validate opening hours before visiting",
            "Carry small change for local transport"
        ],
        "emergency_info": {
            "emergency_number": "112",
            "hospital": format!("{} general hospital", destination),
            "notes": "Keep copies of travel documents"
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItineraryResponse, ProviderErrorKind};

    fn params() -> GenerationParams {
        GenerationParams {
            max_tokens: 1000,
            temperature: 0.0,
            timeout: Duration::from_secs(5),
            model: None,
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "planner".to_string(),
            user: "Destination: Paris, France\n\
                   Dates: 2026-09-10 to 2026-09-12 (3 days)\n\
                   Budget: 900.00 USD total\n"
                .to_string(),
        }
    }

    #[tokio::test]
    async fn test_synthesized_response_parses_as_itinerary() {
        let provider = ScriptedProvider::new();
        let completion = provider.complete(&prompt(), &params()).await.unwrap();

        let itinerary: ItineraryResponse = serde_json::from_str(&completion.text).unwrap();
        assert_eq!(itinerary.destination, "Paris, France");
        assert_eq!(itinerary.duration_days, 3);
        assert_eq!(itinerary.days.len(), 3);
        assert!((itinerary.budget.total - 900.0).abs() < f64::EPSILON);
        // Known destination resolves coordinates
        assert!(!itinerary.days[0].activities[0].location.is_unresolved());
    }

    #[tokio::test]
    async fn test_unknown_destination_gets_zero_coordinates() {
        let provider = ScriptedProvider::new();
        let prompt = Prompt {
            system: String::new(),
            user: "Destination: Ulaanbaatar\nDates: 2026-01-01 to 2026-01-01 (1 days)\n"
                .to_string(),
        };
        let completion = provider.complete(&prompt, &params()).await.unwrap();
        let itinerary: ItineraryResponse = serde_json::from_str(&completion.text).unwrap();
        assert!(itinerary.days[0].activities[0].location.is_unresolved());
    }

    #[tokio::test]
    async fn test_script_consumed_in_order() {
        let provider = ScriptedProvider::new();
        provider.push_failure(ProviderError::new(ProviderErrorKind::RateLimit, "slow down"));
        provider.push_text("{\"ok\": true}");

        let err = provider.complete(&prompt(), &params()).await.unwrap_err();
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::RateLimit));

        let ok = provider.complete(&prompt(), &params()).await.unwrap();
        assert_eq!(ok.text, "{\"ok\": true}");

        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_breakdown_sums_to_total() {
        let provider = ScriptedProvider::new();
        let completion = provider.complete(&prompt(), &params()).await.unwrap();
        let itinerary: ItineraryResponse = serde_json::from_str(&completion.text).unwrap();
        assert!((itinerary.budget.breakdown.total() - itinerary.budget.total).abs() < 0.01);
    }
}
