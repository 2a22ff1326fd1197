//! Chat-completions client for OpenAI-compatible providers (OpenRouter)

use reqwest::Client;
use reso_common::config::LlmSettings;
use reso_common::log_area::{log_llm_interaction, LlmLogContext, LlmStage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

const APP_TITLE: &str = "reso AI Music Discovery";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// LLM client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("LLM API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

/// OpenRouter-style chat completions client
#[derive(Debug, Clone)]
pub struct LlmClient {
    http_client: Client,
    api_url: String,
    api_key: String,
    model: String,
    referer: String,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: settings.api_url.clone(),
            api_key: api_key.into(),
            model: settings.model.clone(),
            referer: settings.referer.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a JSON-mode completion request and return the first choice's content
    pub async fn complete_json(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
        conversation_id: &str,
    ) -> Result<String, LlmError> {
        let start = Instant::now();
        let mut ctx = LlmLogContext {
            conversation_id: Some(conversation_id),
            model: Some(self.model.as_str()),
            ..Default::default()
        };

        log_llm_interaction(
            LlmStage::Prompt,
            "Sending prompt to LLM",
            &json!(messages),
            &ctx,
        );

        let result = self.send(messages, options).await;
        ctx.latency = Some(start.elapsed());

        match result {
            Ok((raw, parsed)) => {
                ctx.token_count = parsed.usage.as_ref().and_then(|u| u.total_tokens);
                log_llm_interaction(LlmStage::Response, "Received response from LLM", &raw, &ctx);

                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| LlmError::Parse("response has no message content".to_string()))
            }
            Err(e) => {
                log_llm_interaction(
                    LlmStage::Error,
                    &format!("Error calling LLM API: {}", e),
                    &Value::Null,
                    &ctx,
                );
                Err(e)
            }
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<(Value, CompletionResponse), LlmError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(status.as_u16(), text));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        let parsed: CompletionResponse =
            serde_json::from_value(raw.clone()).map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok((raw, parsed))
    }
}
