//! Structural Itinerary Validation
//!
//! Validates the parsed JSON value against the itinerary schema before
//! typed deserialization. All violations are collected in one pass and
//! reported together with their field paths, so a bad response surfaces
//! every problem at once instead of failing on the first.

use serde_json::Value;

use crate::types::ActivityType;

/// One schema violation at a concrete field path
#[derive(Debug, Clone)]
pub struct SchemaIssue {
    /// Dotted path like `days[0].activities[2].time`
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Collects every schema violation in a parsed itinerary value
pub struct SchemaChecker {
    issues: Vec<SchemaIssue>,
}

impl SchemaChecker {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Run all checks and return the accumulated issues
    pub fn check(mut self, value: &Value) -> Vec<SchemaIssue> {
        let Some(root) = value.as_object() else {
            self.issues
                .push(SchemaIssue::new("", "top-level value is not an object"));
            return self.issues;
        };

        self.check_string(root.get("destination"), "destination");
        let duration = self.check_uint(root.get("duration_days"), "duration_days");
        self.check_days(root.get("days"), duration);
        self.check_budget(root.get("budget"));
        self.check_emergency(root.get("emergency_info"));

        self.issues
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(SchemaIssue::new(path, message));
    }

    fn check_string(&mut self, value: Option<&Value>, path: &str) {
        match value.and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => {}
            Some(_) => self.push(path, "must not be empty"),
            None => self.push(path, "missing required string field"),
        }
    }

    fn check_uint(&mut self, value: Option<&Value>, path: &str) -> Option<u64> {
        match value.and_then(Value::as_u64) {
            Some(n) if n >= 1 => Some(n),
            Some(_) => {
                self.push(path, "must be at least 1");
                None
            }
            None => {
                self.push(path, "missing required positive integer field");
                None
            }
        }
    }

    fn check_days(&mut self, value: Option<&Value>, duration: Option<u64>) {
        let Some(days) = value.and_then(Value::as_array) else {
            self.push("days", "missing required array field");
            return;
        };

        if days.is_empty() {
            self.push("days", "must contain at least one day");
            return;
        }

        if let Some(duration) = duration
            && days.len() as u64 != duration
        {
            self.push(
                "days",
                format!(
                    "day count {} does not match duration_days {}",
                    days.len(),
                    duration
                ),
            );
        }

        for (i, day) in days.iter().enumerate() {
            let day_path = format!("days[{}]", i);

            let Some(day_obj) = day.as_object() else {
                self.push(&day_path, "must be an object");
                continue;
            };

            // Day numbers are 1-based and sequential
            match day_obj.get("day").and_then(Value::as_u64) {
                Some(n) if n == (i as u64) + 1 => {}
                Some(n) => self.push(
                    format!("{}.day", day_path),
                    format!("expected day {}, got {}", i + 1, n),
                ),
                None => self.push(format!("{}.day", day_path), "missing required day number"),
            }

            let Some(activities) = day_obj.get("activities").and_then(Value::as_array) else {
                self.push(
                    format!("{}.activities", day_path),
                    "missing required array field",
                );
                continue;
            };

            let mut last_minutes: Option<u32> = None;
            for (j, activity) in activities.iter().enumerate() {
                let path = format!("{}.activities[{}]", day_path, j);
                let minutes = self.check_activity(activity, &path);

                if let (Some(prev), Some(current)) = (last_minutes, minutes)
                    && current < prev
                {
                    self.push(
                        format!("{}.time", path),
                        "activities must be chronologically ordered within a day",
                    );
                }
                if minutes.is_some() {
                    last_minutes = minutes;
                }
            }
        }
    }

    fn check_activity(&mut self, value: &Value, path: &str) -> Option<u32> {
        let Some(activity) = value.as_object() else {
            self.push(path, "must be an object");
            return None;
        };

        self.check_string(activity.get("name"), format!("{}.name", path).as_str());

        let minutes = match activity.get("time").and_then(Value::as_str) {
            Some(time) => {
                let parsed = parse_time(time);
                if parsed.is_none() {
                    self.push(
                        format!("{}.time", path),
                        format!("invalid time '{}', expected HH:MM", time),
                    );
                }
                parsed
            }
            None => {
                self.push(format!("{}.time", path), "missing required string field");
                None
            }
        };

        match activity.get("type").and_then(Value::as_str) {
            Some(t) if ActivityType::ALL.contains(&t) => {}
            Some(t) => self.push(
                format!("{}.type", path),
                format!("unknown activity type '{}', expected one of {:?}", t, ActivityType::ALL),
            ),
            None => self.push(format!("{}.type", path), "missing required string field"),
        }

        if let Some(price) = activity.get("price").and_then(Value::as_f64)
            && price < 0.0
        {
            self.push(format!("{}.price", path), "must not be negative");
        }

        match activity.get("location").and_then(Value::as_object) {
            Some(location) => {
                self.check_string(
                    location.get("name"),
                    format!("{}.location.name", path).as_str(),
                );
                let lat = location.get("lat").and_then(Value::as_f64).unwrap_or(0.0);
                let lng = location.get("lng").and_then(Value::as_f64).unwrap_or(0.0);
                // (0,0) means unresolved and is allowed
                let unresolved = lat == 0.0 && lng == 0.0;
                if !unresolved && !(-90.0..=90.0).contains(&lat) {
                    self.push(
                        format!("{}.location.lat", path),
                        format!("latitude {} out of range [-90, 90]", lat),
                    );
                }
                if !unresolved && !(-180.0..=180.0).contains(&lng) {
                    self.push(
                        format!("{}.location.lng", path),
                        format!("longitude {} out of range [-180, 180]", lng),
                    );
                }
            }
            None => self.push(
                format!("{}.location", path),
                "missing required object field",
            ),
        }

        minutes
    }

    fn check_budget(&mut self, value: Option<&Value>) {
        let Some(budget) = value.and_then(Value::as_object) else {
            self.push("budget", "missing required object field");
            return;
        };

        match budget.get("total").and_then(Value::as_f64) {
            Some(total) if total > 0.0 => {}
            Some(_) => self.push("budget.total", "must be positive"),
            None => self.push("budget.total", "missing required number field"),
        }

        self.check_string(budget.get("currency"), "budget.currency");

        match budget.get("breakdown").and_then(Value::as_object) {
            Some(breakdown) => {
                for field in ["accommodation", "food", "activities", "transport"] {
                    if breakdown.get(field).and_then(Value::as_f64).is_none() {
                        self.push(
                            format!("budget.breakdown.{}", field),
                            "missing required number field",
                        );
                    }
                }
            }
            None => self.push("budget.breakdown", "missing required object field"),
        }
    }

    fn check_emergency(&mut self, value: Option<&Value>) {
        match value.and_then(Value::as_object) {
            Some(info) => {
                self.check_string(
                    info.get("emergency_number"),
                    "emergency_info.emergency_number",
                );
            }
            None => self.push("emergency_info", "missing required object field"),
        }
    }
}

impl Default for SchemaChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_time(time: &str) -> Option<u32> {
    let (h, m) = time.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_value() -> Value {
        json!({
            "destination": "Paris",
            "duration_days": 1,
            "days": [
                {
                    "day": 1,
                    "activities": [
                        {
                            "time": "09:00",
                            "name": "Louvre",
                            "type": "museum",
                            "location": {"name": "Louvre", "lat": 48.86, "lng": 2.34},
                            "price": 17.0,
                            "duration_minutes": 180
                        },
                        {
                            "time": "13:00",
                            "name": "Lunch",
                            "type": "restaurant",
                            "location": {"name": "Bistro", "lat": 0.0, "lng": 0.0},
                            "price": 40.0,
                            "duration_minutes": 90
                        }
                    ]
                }
            ],
            "budget": {
                "total": 500.0,
                "currency": "USD",
                "breakdown": {
                    "accommodation": 200.0, "food": 150.0,
                    "activities": 100.0, "transport": 50.0, "misc": 0.0
                }
            },
            "general_tips": [],
            "emergency_info": {"emergency_number": "112"}
        })
    }

    #[test]
    fn test_valid_itinerary_passes() {
        assert!(SchemaChecker::new().check(&valid_value()).is_empty());
    }

    #[test]
    fn test_all_issues_collected_in_one_pass() {
        let mut value = valid_value();
        value["destination"] = json!("");
        value["days"][0]["activities"][0]["type"] = json!("skydiving");
        value["days"][0]["activities"][1]["time"] = json!("27:00");
        value["budget"]["total"] = json!(-5.0);

        let issues = SchemaChecker::new().check(&value);
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();

        assert!(paths.contains(&"destination"));
        assert!(paths.contains(&"days[0].activities[0].type"));
        assert!(paths.contains(&"days[0].activities[1].time"));
        assert!(paths.contains(&"budget.total"));
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn test_chronological_order_enforced() {
        let mut value = valid_value();
        value["days"][0]["activities"][1]["time"] = json!("08:00");

        let issues = SchemaChecker::new().check(&value);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "days[0].activities[1].time");
        assert!(issues[0].message.contains("chronologically"));
    }

    #[test]
    fn test_day_count_must_match_duration() {
        let mut value = valid_value();
        value["duration_days"] = json!(3);

        let issues = SchemaChecker::new().check(&value);
        assert!(issues.iter().any(|i| i.path == "days"));
    }

    #[test]
    fn test_day_numbers_sequential() {
        let mut value = valid_value();
        value["days"][0]["day"] = json!(5);

        let issues = SchemaChecker::new().check(&value);
        assert!(issues.iter().any(|i| i.path == "days[0].day"));
    }

    #[test]
    fn test_coordinate_range_checked() {
        let mut value = valid_value();
        value["days"][0]["activities"][0]["location"]["lat"] = json!(120.0);

        let issues = SchemaChecker::new().check(&value);
        assert!(
            issues
                .iter()
                .any(|i| i.path == "days[0].activities[0].location.lat")
        );
    }

    #[test]
    fn test_unresolved_zero_coordinates_allowed() {
        // Second activity already uses (0,0); it must not be flagged
        let issues = SchemaChecker::new().check(&valid_value());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_emergency_info_flagged() {
        let mut value = valid_value();
        value.as_object_mut().unwrap().remove("emergency_info");

        let issues = SchemaChecker::new().check(&value);
        assert!(issues.iter().any(|i| i.path == "emergency_info"));
    }
}
