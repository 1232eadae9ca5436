//! Anthropic Messages API backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_with_retry, CompletionRequest, LlmError, ModelProvider};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let url = match base_url {
            Some(base) => format!("{}/messages", base.trim_end_matches('/')),
            None => ANTHROPIC_API_URL.to_string(),
        };
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            url,
            model,
        })
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn submit(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let raw = send_with_retry("anthropic", || {
            self.client
                .post(&self.url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
        })
        .await?;

        parse_messages_envelope(&raw)
    }
}

fn parse_messages_envelope(raw: &str) -> Result<String, LlmError> {
    let response: LlmResponse = serde_json::from_str(raw).map_err(|e| LlmError::Upstream {
        status: 200,
        message: format!("unexpected response body: {e}"),
    })?;

    if let Some(usage) = &response.usage {
        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            usage.input_tokens, usage.output_tokens
        );
    }

    let text = response.text().ok_or_else(|| LlmError::Upstream {
        status: 200,
        message: "response has no text content block".to_string(),
    })?;

    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_text_block_is_returned() {
        let raw = r#"{
            "content": [
                {"type": "tool_use", "id": "t"},
                {"type": "text", "text": "{\"demand_score\": 70}"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }"#;
        assert_eq!(
            parse_messages_envelope(raw).unwrap(),
            "{\"demand_score\": 70}"
        );
    }

    #[test]
    fn test_no_text_block_is_upstream_error() {
        let raw = r#"{"content": [], "usage": {"input_tokens": 1, "output_tokens": 0}}"#;
        assert!(matches!(
            parse_messages_envelope(raw),
            Err(LlmError::Upstream { .. })
        ));
    }

    #[test]
    fn test_custom_base_url() {
        let provider = AnthropicProvider::new(
            "k".to_string(),
            Some("http://localhost:9000/v1/".to_string()),
            MODEL.to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(provider.url, "http://localhost:9000/v1/messages");
    }
}
