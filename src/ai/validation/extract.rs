//! JSON Extraction from Model Output
//!
//! Models wrap JSON in markdown fences and prose despite being told not
//! to. Extraction strips fences and locates the first balanced top-level
//! object; it never rewrites the payload. Truncated or unbalanced output
//! is a validation failure, not something to patch up.

use crate::types::{Result, TripError};

/// Strip markdown code fences (```json ... ```), case-insensitive,
/// repeatedly in case of nested wrapping
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim().trim_start_matches('\u{feff}').trim();

    loop {
        let mut stripped = s;

        if stripped.starts_with("```") {
            // Drop the fence line itself ("```", "```json", "```JSON", ...)
            stripped = match stripped.find('\n') {
                Some(idx) => &stripped[idx + 1..],
                None => &stripped[3..],
            };
        }

        if let Some(prefix) = stripped.strip_suffix("```") {
            stripped = prefix;
        }

        stripped = stripped.trim();
        if stripped == s {
            return s;
        }
        s = stripped;
    }
}

/// Locate the first balanced top-level `{...}` span.
///
/// The scan is string- and escape-aware so braces inside string values do
/// not confuse the depth counter. Returns a validation error when no
/// object opens, or when the object never closes (truncated output).
pub fn extract_object(text: &str) -> Result<&str> {
    let start = match text.find('{') {
        Some(idx) => idx,
        None => {
            return Err(TripError::validation(
                "no JSON object found in model output",
                vec![],
                text,
            ));
        }
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Err(TripError::validation(
        "unbalanced braces in model output (likely truncated)",
        vec![],
        text,
    ))
}
