//! OpenAiClient - asks an OpenAI-compatible chat endpoint for a plot
//! specification matching the collected samples.

use std::time::Duration;

use serde::Deserialize;

use super::prompt::request_body;
use super::retry::{is_transient_network_error, parse_retry_after, RetryPolicy};
use super::SynthError;
use crate::extract::PlotSpec;

/// Environment variable holding the API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the API base URL.
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Default API base URL.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-5";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Client for the chat-completions API.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client from `OPENAI_API_KEY` and, if set, `OPENAI_BASE_URL`.
    pub fn new() -> Result<Self, SynthError> {
        let api_key = std::env::var(OPENAI_API_KEY_ENV).map_err(|_| SynthError::MissingApiKey)?;
        match std::env::var(OPENAI_BASE_URL_ENV) {
            Ok(base_url) if !base_url.trim().is_empty() => Self::with_base_url(api_key, base_url),
            _ => Self::with_api_key(api_key),
        }
    }

    pub fn with_api_key(api_key: String) -> Result<Self, SynthError> {
        Self::with_base_url(api_key, OPENAI_API_BASE_URL.to_string())
    }

    /// Useful for pointing at a compatible server or a mock.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, SynthError> {
        if api_key.is_empty() {
            return Err(SynthError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
            http_client,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// One request, no retries.
    pub async fn request_plot_spec(
        &self,
        samples: &[String],
        extra: &str,
    ) -> Result<PlotSpec, SynthError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = request_body(&self.model, samples, extra);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = parse_retry_after(response.headers());
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Rate limit exceeded".to_string());
            log::warn!("Rate limited by synthesis API. Retry-After: {:?} seconds", retry_after_secs);
            return Err(SynthError::RateLimit {
                message,
                retry_after_secs,
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SynthError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        parse_choice(chat)
    }

    /// Request a plot specification, retrying rate limits and transient
    /// failures according to the client's [`RetryPolicy`].
    pub async fn synthesize(&self, samples: &[String], extra: &str) -> Result<PlotSpec, SynthError> {
        let policy = self.retry;
        let mut attempt = 0u32;

        loop {
            let error = match self.request_plot_spec(samples, extra).await {
                Ok(spec) => {
                    log::info!(
                        "synthesized '{}' with {} rule(s) after {} attempt(s)",
                        spec.title,
                        spec.extracts.len(),
                        attempt + 1
                    );
                    return Ok(spec);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(error);
            }
            if attempt >= policy.max_retries {
                log::error!("Synthesis failed after {} attempts. Giving up.", attempt + 1);
                return Err(match error {
                    SynthError::HttpError(e) => SynthError::NetworkError {
                        message: e.to_string(),
                        attempts: attempt + 1,
                    },
                    other => other,
                });
            }

            let retry_after = match &error {
                SynthError::RateLimit {
                    retry_after_secs, ..
                } => *retry_after_secs,
                _ => None,
            };
            let delay = policy.delay(attempt, retry_after);
            log::info!(
                "Synthesis attempt {}/{} failed: {}. Retrying in {:?}...",
                attempt + 1,
                policy.max_retries + 1,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl SynthError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthError::RateLimit { .. } => true,
            SynthError::ApiError { status, .. } => *status >= 500,
            SynthError::HttpError(e) => is_transient_network_error(e),
            _ => false,
        }
    }
}

fn parse_choice(chat: ChatResponse) -> Result<PlotSpec, SynthError> {
    let message = chat
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or(SynthError::EmptyResponse)?;

    if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
        return Err(SynthError::Refusal(refusal));
    }
    let content = message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(SynthError::EmptyResponse)?;

    let spec: PlotSpec =
        serde_json::from_str(&content).map_err(|e| SynthError::MalformedResponse(e.to_string()))?;
    if spec.extracts.is_empty() {
        return Err(SynthError::NoExtracts);
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(content: Option<&str>, refusal: Option<&str>) -> ChatResponse {
        ChatResponse {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: content.map(String::from),
                    refusal: refusal.map(String::from),
                },
            }],
        }
    }

    #[test]
    fn test_with_api_key_creates_client() {
        let client = OpenAiClient::with_api_key("test-key".to_string()).unwrap();
        assert_eq!(client.api_key(), "test-key");
        assert_eq!(client.base_url(), OPENAI_API_BASE_URL);
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_with_api_key_empty_returns_error() {
        assert!(matches!(
            OpenAiClient::with_api_key(String::new()),
            Err(SynthError::MissingApiKey)
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            OpenAiClient::with_base_url("k".to_string(), "http://localhost:1234/v1/".to_string())
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
    }

    #[test]
    fn test_parse_choice_ok() {
        let spec = parse_choice(chat(
            Some(r#"{"title":"Mem","extracts":[{"name":"mem","regex":"(\\d+)MB","group":1,"unit":"MB","scale":1.0}],"legend":"Value","unit":null}"#),
            None,
        ))
        .unwrap();
        assert_eq!(spec.title, "Mem");
        assert_eq!(spec.extracts[0].unit.as_deref(), Some("MB"));
        assert_eq!(spec.unit, None);
    }

    #[test]
    fn test_parse_choice_refusal() {
        assert!(matches!(
            parse_choice(chat(None, Some("no"))),
            Err(SynthError::Refusal(r)) if r == "no"
        ));
    }

    #[test]
    fn test_parse_choice_empty() {
        assert!(matches!(
            parse_choice(ChatResponse { choices: vec![] }),
            Err(SynthError::EmptyResponse)
        ));
        assert!(matches!(
            parse_choice(chat(Some("  "), None)),
            Err(SynthError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_choice_malformed_and_no_extracts() {
        assert!(matches!(
            parse_choice(chat(Some("not json"), None)),
            Err(SynthError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_choice(chat(Some(r#"{"title":"x","extracts":[]}"#), None)),
            Err(SynthError::NoExtracts)
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SynthError::RateLimit {
            message: String::new(),
            retry_after_secs: None
        }
        .is_retryable());
        assert!(SynthError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!SynthError::ApiError {
            status: 401,
            message: String::new()
        }
        .is_retryable());
        assert!(!SynthError::NoExtracts.is_retryable());
    }
}
