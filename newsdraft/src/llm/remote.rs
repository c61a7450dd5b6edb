use anyhow::{Context, Result};
use common::LlmConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use super::{ChatMessage, LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// How much of a non-success response body is written to the log
const ERROR_BODY_LOG_CHARS: usize = 1000;

/// Remote LLM provider using an OpenAI-compatible chat-completions API (Groq by default)
pub struct RemoteLlmProvider {
    base_url: String,
    api_key: String,
    model: String,
    default_timeout: Duration,
    default_max_tokens: usize,
    default_temperature: f32,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            default_timeout: Duration::from_secs(120),
            default_max_tokens: 1024,
            default_temperature: 0.7,
            client: reqwest::Client::new(),
        }
    }

    /// Build a provider from the `[llm]` config section.
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self::new(&config.api_url, api_key, &config.generation_model).with_defaults(
            config.timeout_seconds,
            1024,
            0.7,
        )
    }

    pub fn with_defaults(
        mut self,
        timeout_secs: u64,
        max_tokens: usize,
        temperature: f32,
    ) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let model = request.model.unwrap_or_else(|| self.model.clone());

        if self.api_key.trim().is_empty() {
            anyhow::bail!("LLM API key is missing for model {}", model);
        }

        let timeout = request
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let req_body = OpenAiRequest {
            model: model.clone(),
            messages: request.messages,
            max_tokens: request.max_tokens.unwrap_or(self.default_max_tokens),
            temperature: request.temperature.unwrap_or(self.default_temperature),
        };

        info!("Querying LLM model {}...", model);

        // The timeout covers both the round trip and reading the body
        let (status, body) = tokio::time::timeout(timeout, async {
            let response = self
                .client
                .post(&self.base_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send()
                .await
                .context("LLM HTTP request failed")?;
            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read LLM response body")?;
            Ok::<_, anyhow::Error>((status, body))
        })
        .await
        .with_context(|| format!("Request to LLM model {} timed out", model))??;

        if !status.is_success() {
            let excerpt: String = body.chars().take(ERROR_BODY_LOG_CHARS).collect();
            error!(
                "LLM API returned non-success status {}. Response text: {}",
                status, excerpt
            );
            anyhow::bail!("LLM API error {} for model {}", status, model);
        }

        let resp_body: OpenAiResponse =
            serde_json::from_str(&body).context("Failed to parse LLM response")?;

        if let Some(err) = resp_body.error {
            anyhow::bail!("LLM API reported an error: {}", err);
        }

        let choice = resp_body
            .choices
            .first()
            .context("LLM response has no choices")?;

        let content = choice
            .message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .context("LLM response choice has no message content")?
            .trim()
            .to_string();

        info!("Successfully received response from LLM model {}", model);

        let usage = resp_body.usage.map(|u| UsageMetadata {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        if let Some(usage) = &usage {
            info!(
                "LLM usage - prompt: {}, completion: {}, total: {}",
                display_count(usage.prompt_tokens),
                display_count(usage.completion_tokens),
                display_count(usage.total_tokens)
            );
        }

        Ok(LlmResponse {
            content,
            usage,
            model: resp_body.model.unwrap_or(model),
        })
    }
}

fn display_count(count: Option<usize>) -> String {
    count.map_or_else(|| "N/A".to_string(), |c| c.to_string())
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LlmRequest {
        LlmRequest {
            model: None,
            messages: vec![ChatMessage::user("Test")],
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        }
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_request() {
        // Unroutable URL: reaching the network would fail differently
        let provider = RemoteLlmProvider::new("http://127.0.0.1:9/never", "", "m");
        let err = provider.generate(request()).await.unwrap_err();
        assert!(err.to_string().contains("API key is missing"));
    }

    #[test]
    fn response_tolerates_missing_optional_fields() {
        let parsed: OpenAiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(parsed.choices.is_empty());
        assert!(parsed.usage.is_none());
        assert!(parsed.error.is_none());

        let parsed: OpenAiResponse =
            serde_json::from_str(r#"{"error": {"message": "bad key"}}"#).unwrap();
        assert!(parsed.error.is_some());
    }

    #[test]
    fn display_count_marks_missing_counters() {
        assert_eq!(display_count(Some(12)), "12");
        assert_eq!(display_count(None), "N/A");
    }
}
