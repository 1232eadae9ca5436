use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::analysis::scoring::FitWeights;

/// Which backend the AI delegate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    DeepSeek,
    OpenAi,
    Anthropic,
}

impl AiProvider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(AiProvider::DeepSeek),
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            other => bail!("AI_PROVIDER must be one of deepseek, openai, anthropic (got '{other}')"),
        }
    }

    /// Environment variable holding the credential for this provider.
    pub fn key_var(self) -> &'static str {
        match self {
            AiProvider::DeepSeek => "DEEPSEEK_API_KEY",
            AiProvider::OpenAi => "OPENAI_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// What to do with a document that yields fewer than `min_text_chars` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsufficientTextPolicy {
    Reject,
    Placeholder,
}

/// Application configuration loaded from environment variables.
/// Nothing is mandatory: missing credentials switch the matching feature off.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ai_provider: AiProvider,
    pub ai_api_key: Option<String>,
    pub ai_model: Option<String>,
    pub ai_base_url: Option<String>,
    pub ai_timeout: Duration,
    pub ai_max_tokens: u32,
    pub ai_temperature: f32,
    pub jsearch_api_key: Option<String>,
    pub job_search_region: String,
    pub job_lookup_timeout: Duration,
    pub max_text_chars: usize,
    pub prompt_text_chars: usize,
    pub min_text_chars: usize,
    pub insufficient_text_policy: InsufficientTextPolicy,
    pub role_skills: Vec<String>,
    pub fit_weights: FitWeights,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ai_provider = match get("AI_PROVIDER") {
            Some(v) => AiProvider::parse(&v)?,
            None => AiProvider::DeepSeek,
        };

        let defaults = FitWeights::default();
        let fit_weights = FitWeights {
            skills: parse_or(&get, "FIT_WEIGHT_SKILLS", defaults.skills)?,
            demand: parse_or(&get, "FIT_WEIGHT_DEMAND", defaults.demand)?,
            salary: parse_or(&get, "FIT_WEIGHT_SALARY", defaults.salary)?,
            constant: parse_or(&get, "FIT_CONSTANT", defaults.constant)?,
        };

        let insufficient_text_policy = match get("INSUFFICIENT_TEXT_POLICY").as_deref() {
            None | Some("reject") => InsufficientTextPolicy::Reject,
            Some("placeholder") => InsufficientTextPolicy::Placeholder,
            Some(other) => bail!(
                "INSUFFICIENT_TEXT_POLICY must be 'reject' or 'placeholder' (got '{other}')"
            ),
        };

        let role_skills = get("ROLE_SKILLS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| {
                crate::analysis::skills::DEFAULT_ROLE_SKILLS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Ok(Config {
            port: parse_or(&get, "PORT", 5000u16)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            ai_provider,
            ai_api_key: get(ai_provider.key_var()),
            ai_model: get("AI_MODEL"),
            ai_base_url: get("AI_BASE_URL"),
            ai_timeout: Duration::from_secs(parse_or(&get, "AI_TIMEOUT_SECS", 30u64)?),
            ai_max_tokens: parse_or(&get, "AI_MAX_TOKENS", 1200u32)?,
            ai_temperature: parse_or(&get, "AI_TEMPERATURE", 0.2f32)?,
            jsearch_api_key: get("JSEARCH_API_KEY"),
            job_search_region: get("JOB_SEARCH_REGION").unwrap_or_else(|| "india".to_string()),
            job_lookup_timeout: Duration::from_secs(parse_or(
                &get,
                "JOB_LOOKUP_TIMEOUT_SECS",
                20u64,
            )?),
            max_text_chars: parse_or(&get, "MAX_TEXT_CHARS", 6000usize)?,
            prompt_text_chars: parse_or(&get, "PROMPT_TEXT_CHARS", 4500usize)?,
            min_text_chars: parse_or(&get, "MIN_TEXT_CHARS", 20usize)?,
            insufficient_text_policy,
            role_skills,
            fit_weights,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.split(',') {
        let item = item.trim().to_lowercase();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.ai_provider, AiProvider::DeepSeek);
        assert!(config.ai_api_key.is_none());
        assert!(config.jsearch_api_key.is_none());
        assert_eq!(config.max_text_chars, 6000);
        assert_eq!(config.min_text_chars, 20);
        assert_eq!(config.insufficient_text_policy, InsufficientTextPolicy::Reject);
        assert!(config.role_skills.contains(&"python".to_string()));
    }

    #[test]
    fn test_key_is_read_for_selected_provider() {
        let config = config_from(&[
            ("AI_PROVIDER", "anthropic"),
            ("DEEPSEEK_API_KEY", "ds"),
            ("ANTHROPIC_API_KEY", "an"),
        ])
        .unwrap();
        assert_eq!(config.ai_provider, AiProvider::Anthropic);
        assert_eq!(config.ai_api_key.as_deref(), Some("an"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = config_from(&[("DEEPSEEK_API_KEY", "   ")]).unwrap();
        assert!(config.ai_api_key.is_none());
    }

    #[test]
    fn test_invalid_number_names_the_key() {
        let err = config_from(&[("AI_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("AI_TIMEOUT_SECS"));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(config_from(&[("AI_PROVIDER", "llama")]).is_err());
    }

    #[test]
    fn test_role_skills_are_lowercased_and_deduplicated() {
        let config = config_from(&[("ROLE_SKILLS", "Rust, SQL,rust, ,Docker")]).unwrap();
        assert_eq!(config.role_skills, vec!["rust", "sql", "docker"]);
    }

    #[test]
    fn test_fit_weights_override() {
        let config = config_from(&[("FIT_WEIGHT_SKILLS", "0.7"), ("FIT_CONSTANT", "5")]).unwrap();
        assert!((config.fit_weights.skills - 0.7).abs() < f64::EPSILON);
        assert!((config.fit_weights.constant - 5.0).abs() < f64::EPSILON);
        assert!((config.fit_weights.demand - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_placeholder_policy() {
        let config = config_from(&[("INSUFFICIENT_TEXT_POLICY", "placeholder")]).unwrap();
        assert_eq!(
            config.insufficient_text_policy,
            InsufficientTextPolicy::Placeholder
        );
    }
}
