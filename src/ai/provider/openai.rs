//! OpenAI API Provider
//!
//! Completion provider using OpenAI's Chat Completions API.
//! HTTP failures are normalized into the `ProviderErrorKind` taxonomy via
//! `ErrorClassifier`, and the per-attempt deadline is enforced here with
//! `tokio::time::timeout` rather than trusting the HTTP client's own timer.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{Completion, CompletionMetadata, CompletionProvider, GenerationParams, TokenUsage};
use crate::ai::prompt::Prompt;
use crate::config::ProviderSettings;
use crate::types::{ErrorClassifier, ProviderError, ProviderErrorKind, Result, TripError};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let api_key_str = settings
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                TripError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = settings
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        // Connect timeout only; the request deadline is enforced per call
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TripError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model: settings.model,
            client,
        })
    }

    fn build_request(&self, prompt: &Prompt, params: &GenerationParams) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: params.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            temperature: params.temperature,
            max_tokens: Some(params.max_tokens),
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    async fn send(&self, prompt: &Prompt, params: &GenerationParams) -> Result<Completion> {
        let start_time = Instant::now();
        let request = self.build_request(prompt, params);
        let model = request.model.clone();
        let url = format!("{}/chat/completions", self.api_base);

        debug!("Sending request to OpenAI API (model: {})", model);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                TripError::Provider(ErrorClassifier::from_message(&e.to_string(), "openai"))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let mut err = ErrorClassifier::from_status(status, &body, "openai");
            if let Some(delay) = retry_after {
                err = err.retry_after(delay);
            }
            return Err(TripError::Provider(err));
        }

        let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
            TripError::Provider(
                ProviderError::new(
                    ProviderErrorKind::Unknown,
                    format!("failed to parse OpenAI response: {}", e),
                )
                .provider("openai"),
            )
        })?;

        let elapsed = start_time.elapsed();

        let usage = response_body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let text = response_body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                TripError::Provider(
                    ProviderError::new(ProviderErrorKind::Unknown, "empty response payload")
                        .provider("openai"),
                )
            })?;

        Ok(Completion {
            text,
            usage,
            elapsed,
            metadata: CompletionMetadata {
                model,
                provider: "openai".to_string(),
            },
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &Prompt, params: &GenerationParams) -> Result<Completion> {
        info!(
            "Generating with OpenAI (model: {}, max_tokens: {})",
            params.model.as_deref().unwrap_or(&self.model),
            params.max_tokens
        );

        // Deadline enforced here; the SDK timeout is not trusted
        match tokio::time::timeout(params.timeout, self.send(prompt, params)).await {
            Ok(result) => result,
            Err(_) => Err(TripError::Provider(
                ProviderError::new(
                    ProviderErrorKind::Timeout,
                    format!("request exceeded {:?} deadline", params.timeout),
                )
                .provider("openai"),
            )),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Parse a `Retry-After` header, either delay-seconds or an HTTP-date.
/// A date in the past yields no hint.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let date = chrono::DateTime::parse_from_rfc2822(raw).ok()?;
    (date.with_timezone(&chrono::Utc) - chrono::Utc::now())
        .to_std()
        .ok()
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        // Only runs meaningfully when OPENAI_API_KEY is unset, which is the
        // normal CI environment
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let settings = ProviderSettings {
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(
            OpenAiProvider::new(settings),
            Err(TripError::Config(_))
        ));
    }

    #[test]
    fn test_debug_never_leaks_key() {
        let settings = ProviderSettings {
            api_key: Some("sk-test-secret".to_string()),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(settings).unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-test-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_retry_after_seconds_form() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_retry_after_http_date_form() {
        let future = chrono::Utc::now() + chrono::Duration::seconds(60);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::RETRY_AFTER,
            future.to_rfc2822().parse().unwrap(),
        );
        let parsed = parse_retry_after(&headers).unwrap();
        assert!(parsed > Duration::from_secs(50));
        assert!(parsed <= Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_absent_or_garbage_yields_none() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);

        // A date in the past is not a usable hint
        let past = chrono::Utc::now() - chrono::Duration::seconds(60);
        headers.insert(
            reqwest::header::RETRY_AFTER,
            past.to_rfc2822().parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_request_model_override() {
        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(settings).unwrap();
        let prompt = Prompt {
            system: "sys".to_string(),
            user: "user".to_string(),
        };
        let params = GenerationParams {
            max_tokens: 100,
            temperature: 0.7,
            timeout: Duration::from_secs(1),
            model: Some("gpt-4o".to_string()),
        };

        let request = provider.build_request(&prompt, &params);
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages.len(), 2);
    }
}
