//! Job Lookup: search an external job-listing API for postings matching a skill
//! and region. Failures never reach the caller as errors; the pipeline turns them
//! into an empty job list plus a diagnostic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::report::JobPosting;

const JSEARCH_URL: &str = "https://jsearch.p.rapidapi.com/search";
const JSEARCH_HOST: &str = "jsearch.p.rapidapi.com";

/// Postings kept per lookup.
pub const MAX_POSTINGS: usize = 8;

#[derive(Debug, Error)]
pub enum JobLookupError {
    #[error("Job search is not configured")]
    Disabled,

    #[error("Job search timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Job search error (status {status}): {message}")]
    Upstream { status: u16, message: String },
}

#[async_trait]
pub trait JobLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<JobPosting>, JobLookupError>;
}

/// Used when no job-search credential is configured.
pub struct DisabledJobLookup;

#[async_trait]
impl JobLookup for DisabledJobLookup {
    async fn search(&self, _query: &str) -> Result<Vec<JobPosting>, JobLookupError> {
        Err(JobLookupError::Disabled)
    }
}

/// RapidAPI JSearch client. One page per query.
pub struct JSearchClient {
    client: Client,
    api_key: String,
    url: String,
}

impl JSearchClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, JobLookupError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            url: JSEARCH_URL.to_string(),
        })
    }
}

#[async_trait]
impl JobLookup for JSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<JobPosting>, JobLookupError> {
        debug!("Searching jobs for '{query}'");

        let response = self
            .client
            .get(&self.url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", JSEARCH_HOST)
            .query(&[("query", query), ("page", "1"), ("num_pages", "1")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("Job search timed out for '{query}'");
                }
                JobLookupError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(JobLookupError::Upstream {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body: Value = response.json().await?;
        let postings = parse_postings(&body).ok_or_else(|| JobLookupError::Upstream {
            status: status.as_u16(),
            message: "response has no 'data' list".to_string(),
        })?;

        info!("Job search for '{query}' returned {} postings", postings.len());
        Ok(postings)
    }
}

/// Picks the configured backend. A missing key disables lookups; it is not an error.
pub fn build_job_lookup(config: &Config) -> Result<Arc<dyn JobLookup>, JobLookupError> {
    match &config.jsearch_api_key {
        Some(key) => Ok(Arc::new(JSearchClient::new(
            key.clone(),
            config.job_lookup_timeout,
        )?)),
        None => {
            warn!("JSEARCH_API_KEY is not set; job lookups are disabled");
            Ok(Arc::new(DisabledJobLookup))
        }
    }
}

/// Query string for a skill and region, e.g. "python India".
pub fn job_query(skill: &str, region: &str) -> String {
    format!("{} {}", skill.trim(), region.trim()).trim().to_string()
}

/// Reads the `data` list of a search response. Each record keeps its first
/// non-empty title/company/location/description candidate.
pub fn parse_postings(body: &Value) -> Option<Vec<JobPosting>> {
    let records = body.get("data")?.as_array()?;
    Some(
        records
            .iter()
            .filter(|record| record.is_object())
            .take(MAX_POSTINGS)
            .map(|record| JobPosting {
                title: first_text(record, &["job_title", "title"]),
                company: first_text(record, &["employer_name", "company_name", "company"]),
                location: location_of(record),
                description: first_text(record, &["job_description", "description"]),
            })
            .collect(),
    )
}

fn first_text(record: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn location_of(record: &Value) -> String {
    let explicit = first_text(record, &["job_location", "location"]);
    if !explicit.is_empty() {
        return explicit;
    }
    ["job_city", "job_state", "job_country"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
