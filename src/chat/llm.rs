//! OpenAI-compatible chat-completion client

use super::settings::AiConfig;
use super::types::Role;
use crate::error::{PanelError, PanelResult};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One entry of the `messages` array sent upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

impl LlmMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Chat completion backend
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send `messages` with the endpoint settings of `config` and return the
    /// reply text
    async fn complete(&self, config: &AiConfig, messages: &[LlmMessage]) -> PanelResult<String>;
}

/// `POST {baseURL}/chat/completions` with bearer auth
#[derive(Debug, Clone, Default)]
pub struct OpenAiClient {
    client: Client,
}

impl OpenAiClient {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Request body: `model` and `messages` on top of the configured defaults
pub fn completion_body(config: &AiConfig, messages: &[LlmMessage]) -> PanelResult<Value> {
    let mut body: Map<String, Value> = config.default_params.clone();
    body.insert("model".to_string(), Value::String(config.model.clone()));
    body.insert("messages".to_string(), serde_json::to_value(messages)?);
    Ok(Value::Object(body))
}

/// `choices[0].message.content` of a completion response
pub fn reply_text(response: &Value) -> PanelResult<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PanelError::MalformedResponse("completion has no choices[0].message.content".into())
        })
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, config: &AiConfig, messages: &[LlmMessage]) -> PanelResult<String> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let body = completion_body(config, messages)?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| PanelError::Validation(format!("invalid API key: {e}")))?;

        debug!("🧠 POST {} ({} messages)", url, messages.len());
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .timeout(config.timeout())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(PanelError::from_status(status.as_u16(), &text));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| PanelError::MalformedResponse(e.to_string()))?;
        reply_text(&parsed)
    }
}
