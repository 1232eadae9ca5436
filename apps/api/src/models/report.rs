use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Annual salary estimate in a single currency unit. Always `min <= median <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryEstimate {
    pub min: u64,
    pub median: u64,
    pub max: u64,
}

impl SalaryEstimate {
    /// Orders the three values so the invariant holds whatever the caller passed.
    pub fn new(min: u64, median: u64, max: u64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            median: median.clamp(min, max),
            max,
        }
    }

    /// Relative position of the median inside the range, 0.5 for a degenerate range.
    pub fn median_position(&self) -> f64 {
        if self.max == self.min {
            return 0.5;
        }
        (self.median - self.min) as f64 / (self.max - self.min) as f64
    }
}

/// Bucketed salary spread. Counts are synthetic weights, not sample counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryDistribution {
    labels: Vec<String>,
    counts: Vec<u32>,
}

impl SalaryDistribution {
    pub fn from_buckets(buckets: Vec<(String, u32)>) -> Self {
        let (labels, counts) = buckets.into_iter().unzip();
        Self { labels, counts }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapEntry {
    pub steps: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPlan {
    /// Highest priority first.
    pub priority: Vec<String>,
    pub roadmap: BTreeMap<String, RoadmapEntry>,
    pub short_note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    ExtractionFallback,
    TextPlaceholder,
    AiUnavailable,
    AiTimeout,
    AiTransportError,
    AiUpstreamError,
    AiMalformedOutput,
    JobLookupFailed,
}

/// Non-blocking note about a failure that was absorbed while building the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
}

/// The canonical response document. Every field is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub resume_text: String,
    pub required_skills: Vec<String>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub salary_range: SalaryEstimate,
    pub salary_distribution: SalaryDistribution,
    pub demand_score: u8,
    pub ats_score: u8,
    pub fit_score: u8,
    pub ai_plan: LearningPlan,
    pub jobs: Vec<JobPosting>,
    pub source: AnalysisSource,
    /// The model reply as received, capped; empty when no model answered.
    pub ai_raw: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub fn with_jobs(mut self, jobs: Vec<JobPosting>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_diagnostic(mut self, code: DiagnosticCode, message: impl Into<String>) -> Self {
        self.diagnostics.push(Diagnostic {
            code,
            message: message.into(),
        });
        self
    }

    #[cfg(test)]
    pub fn has_diagnostic(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salary_estimate_orders_inputs() {
        let s = SalaryEstimate::new(900, 100, 300);
        assert_eq!((s.min, s.median, s.max), (300, 300, 900));
    }

    #[test]
    fn test_median_position_degenerate_range() {
        assert_eq!(SalaryEstimate::new(5, 5, 5).median_position(), 0.5);
        assert_eq!(SalaryEstimate::new(0, 50, 100).median_position(), 0.5);
        assert_eq!(SalaryEstimate::new(0, 100, 100).median_position(), 1.0);
    }

    #[test]
    fn test_distribution_serializes_as_parallel_lists() {
        let dist = SalaryDistribution::from_buckets(vec![("a".into(), 2), ("b".into(), 1)]);
        let json = serde_json::to_value(&dist).unwrap();
        assert_eq!(json["labels"], serde_json::json!(["a", "b"]));
        assert_eq!(json["counts"], serde_json::json!([2, 1]));
    }

    #[test]
    fn test_diagnostic_code_is_snake_case() {
        let json = serde_json::to_string(&DiagnosticCode::AiMalformedOutput).unwrap();
        assert_eq!(json, "\"ai_malformed_output\"");
    }
}
