/// Claude client over the Anthropic Messages API.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionClient, LlmError};
use crate::config::LlmConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    max_retries: u32,
}

impl AnthropicClient {
    /// Build a client, reading the API key from the variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("orion-analyzer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/v1/messages", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn send_once(&self, body: &MessageRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;
        Ok(resp)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(attempt.min(6)))
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 0;
        let resp = loop {
            let resp = self.send_once(&body).await?;
            let status = resp.status();
            if status.is_success() {
                break resp;
            }

            if is_retryable(status) && attempt < self.max_retries {
                let wait = backoff(attempt);
                attempt += 1;
                warn!("Model API returned {status}, retrying in {wait:?} (attempt {attempt})");
                tokio::time::sleep(wait).await;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited(attempt + 1));
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        };

        let parsed: MessageResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if parsed.stop_reason.as_deref() == Some("max_tokens") {
            debug!("Model reply hit max_tokens and may be cut off");
        }

        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "reply contained no text blocks".into(),
            ));
        }
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
