//! AI Delegate: sends the résumé text to the configured model with the analysis
//! schema and hands back the raw reply. It does no interpretation; that is the
//! normalizer's job. Calls are stateless and bounded by a hard timeout.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::analysis::prompts::{analysis_system, build_analysis_prompt};
use crate::extraction::ExtractedText;
use crate::llm_client::{CompletionRequest, LlmError, ModelProvider};

#[derive(Clone)]
pub struct AiDelegate {
    provider: Option<Arc<dyn ModelProvider>>,
    system: String,
    timeout: Duration,
    prompt_chars: usize,
    temperature: f32,
    max_tokens: u32,
}

impl AiDelegate {
    pub fn new(
        provider: Option<Arc<dyn ModelProvider>>,
        timeout: Duration,
        prompt_chars: usize,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            system: analysis_system(),
            timeout,
            prompt_chars,
            temperature,
            max_tokens,
        }
    }

    pub async fn ask(&self, text: &ExtractedText) -> Result<String, LlmError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| LlmError::Unavailable("no provider credential".to_string()))?;

        let prompt = build_analysis_prompt(text.head(self.prompt_chars));
        let request = CompletionRequest {
            system: &self.system,
            prompt: &prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let raw = tokio::time::timeout(self.timeout, provider.submit(&request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;

        info!(
            "{} returned {} characters of analysis",
            provider.name(),
            raw.chars().count()
        );
        Ok(raw)
    }
}
