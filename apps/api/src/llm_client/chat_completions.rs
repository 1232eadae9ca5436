//! OpenAI-compatible chat-completions backend (DeepSeek, OpenAI).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_with_retry, CompletionRequest, LlmError, ModelProvider};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub struct ChatCompletionsProvider {
    label: &'static str,
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl ChatCompletionsProvider {
    pub fn new(
        label: &'static str,
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            label,
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
        })
    }
}

#[async_trait]
impl ModelProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        self.label
    }

    async fn submit(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let raw = send_with_retry(self.label, || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(self.api_key.trim())
                .json(&body)
        })
        .await?;

        parse_chat_envelope(&raw)
    }
}

/// Expects `{"choices": [{"message": {"content": "..."}}]}`; anything else is an
/// upstream error.
fn parse_chat_envelope(raw: &str) -> Result<String, LlmError> {
    let envelope: ChatEnvelope = serde_json::from_str(raw).map_err(|e| LlmError::Upstream {
        status: 200,
        message: format!("unexpected response body: {e}"),
    })?;

    if let Some(usage) = &envelope.usage {
        debug!(
            "Chat completion succeeded: prompt_tokens={}, completion_tokens={}",
            usage.prompt_tokens, usage.completion_tokens
        );
    }

    let content = envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| LlmError::Upstream {
            status: 200,
            message: "response has no choices[0].message.content".to_string(),
        })?;

    if content.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(content)
}
