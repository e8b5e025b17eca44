use crate::traits::ChatModel;
use crate::{ChatMessage, SearchError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

const BACKEND: &str = "openai";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl OpenAiChatConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            max_retries: 3,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct OpenAiChat {
    client: Client,
    config: OpenAiChatConfig,
}

impl OpenAiChat {
    pub fn new(config: OpenAiChatConfig) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, SearchError> {
        let body = json!({
            "model": self.config.model,
            "messages": messages,
        });

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(error) => {
                    warn!(attempt, %error, "chat completion request failed");
                    last_error = Some(SearchError::Http(error));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let payload: Value = response.json().await?;
                return parse_completion(&payload);
            }

            let details = format!("{status}: {}", response.text().await.unwrap_or_default());
            let error = SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details,
            };
            if status.as_u16() == 429 || status.is_server_error() {
                warn!(attempt, %status, "chat completion will be retried");
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error
            .unwrap_or_else(|| SearchError::Request("chat completion failed after retries".to_string())))
    }
}

pub fn parse_completion(payload: &Value) -> Result<String, SearchError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| SearchError::BackendResponse {
            backend: BACKEND.to_string(),
            details: "completion has no message content".to_string(),
        })
}
