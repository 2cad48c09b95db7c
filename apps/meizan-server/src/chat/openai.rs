//! External chat-completion call. The model is an untrusted black box:
//! this module only transports bytes; everything it returns goes
//! through `validate` before any of it is believed.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use super::prompt::PromptMessage;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Hard per-call ceiling; enforced by the dedicated reqwest client so a
/// stalled upstream can never hang the pipeline.
pub const MODEL_CALL_TIMEOUT: Duration = Duration::from_secs(15);
const TEMPERATURE: f64 = 0.4;
const MAX_TOKENS: u32 = 400;

#[derive(Debug, Error)]
pub enum ModelCallError {
    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model call failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the prompt requesting a JSON-object response; returns the
    /// raw text content of the first choice.
    async fn complete_json(&self, messages: &[PromptMessage]) -> Result<String, ModelCallError>;
}

pub struct OpenAiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            client: crate::http_client::client_with_timeout(MODEL_CALL_TIMEOUT),
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete_json(&self, messages: &[PromptMessage]) -> Result<String, ModelCallError> {
        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "response_format": {"type": "json_object"},
            "messages": messages,
        });
        let resp = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelCallError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let value: Value = resp.json().await?;
        Ok(value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}
