/// LLM Client: the single point of entry for all outbound model calls.
///
/// ARCHITECTURAL RULE: No other module may call a model API directly.
/// Backends implement `ModelProvider`; the active one is picked once at startup.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AiProvider, Config};

pub mod anthropic;
pub mod chat_completions;
pub mod prompts;

pub use anthropic::AnthropicProvider;
pub use chat_completions::ChatCompletionsProvider;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No model credential configured ({0})")]
    Unavailable(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Model returned empty content")]
    EmptyContent,
}

/// One stateless completion: fixed system text plus a single user message.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A model backend. Returns the model's text verbatim, with no interpretation.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

/// Builds the configured provider, or `None` when its credential is missing.
pub fn build_provider(config: &Config) -> Result<Option<Arc<dyn ModelProvider>>, LlmError> {
    let Some(api_key) = config.ai_api_key.clone() else {
        warn!(
            "{} is not set; analysis will use the heuristic path only",
            config.ai_provider.key_var()
        );
        return Ok(None);
    };

    let provider: Arc<dyn ModelProvider> = match config.ai_provider {
        AiProvider::DeepSeek => Arc::new(ChatCompletionsProvider::new(
            "deepseek",
            api_key,
            config
                .ai_base_url
                .clone()
                .unwrap_or_else(|| chat_completions::DEEPSEEK_BASE_URL.to_string()),
            config
                .ai_model
                .clone()
                .unwrap_or_else(|| chat_completions::DEEPSEEK_MODEL.to_string()),
            config.ai_timeout,
        )?),
        AiProvider::OpenAi => Arc::new(ChatCompletionsProvider::new(
            "openai",
            api_key,
            config
                .ai_base_url
                .clone()
                .unwrap_or_else(|| chat_completions::OPENAI_BASE_URL.to_string()),
            config
                .ai_model
                .clone()
                .unwrap_or_else(|| chat_completions::OPENAI_MODEL.to_string()),
            config.ai_timeout,
        )?),
        AiProvider::Anthropic => Arc::new(AnthropicProvider::new(
            api_key,
            config.ai_base_url.clone(),
            config
                .ai_model
                .clone()
                .unwrap_or_else(|| anthropic::MODEL.to_string()),
            config.ai_timeout,
        )?),
    };

    info!("Model provider initialized: {}", provider.name());
    Ok(Some(provider))
}

/// Sends the request built by `build`, returning the success body as text.
/// Retries on transport errors, 429 and 5xx with exponential backoff.
pub(crate) async fn send_with_retry<F>(provider: &str, build: F) -> Result<String, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "{provider} call attempt {attempt} failed, retrying after {}ms...",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Transport(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("{provider} API returned {status}: {body}");
            last_error = Some(LlmError::Upstream {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        return Ok(response.text().await?);
    }

    Err(last_error.unwrap_or(LlmError::Upstream {
        status: 0,
        message: format!("{provider} gave no response after {MAX_ATTEMPTS} attempts"),
    }))
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Pulls `error.message` out of an error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}
