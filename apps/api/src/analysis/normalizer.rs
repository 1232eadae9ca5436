//! Response Normalizer: turns whatever the model said into a complete
//! `AnalysisReport`, or builds one from heuristics when it said nothing usable.
//!
//! Algorithm:
//! 1. Bracket-scan: parse the text between the first `{` and the last `}`.
//!    Models wrap JSON in prose or code fences; this tolerates both.
//! 2. Coerce each expected field on its own. A missing or mistyped field gets its
//!    documented default; the rest of the object is still used.
//! 3. No object at all (or no model reply) → heuristic path: skill matcher,
//!    default salary band, template learning plan.
//! 4. Both paths finish with the same derived scores, clamped to 0..=100.
//!
//! Nothing here returns an error. A `ParseIssue` only decides which path runs and
//! is reported as an `ai_malformed_output` diagnostic.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::salary::{
    default_demand, demand_from_text, salary_from_text, synthesize, synthesize_distribution,
    DEFAULT_SALARY, MAX_SALARY_TOKEN,
};
use crate::analysis::scoring::{clamp_score, compute_fit_score, FitWeights};
use crate::analysis::skills::{normalize_skill_list, parse_skills_line, RequiredSkills, SkillMatch, SkillMatcher};
use crate::extraction::ExtractedText;
use crate::models::report::{
    AnalysisReport, AnalysisSource, DiagnosticCode, LearningPlan, RoadmapEntry,
    SalaryDistribution, SalaryEstimate,
};

/// Steps for every skill in a template roadmap.
pub const TEMPLATE_STEPS: &[&str] = &["learn basics", "build a project", "add to resume"];
/// Generic resources for every skill in a template roadmap.
pub const TEMPLATE_RESOURCES: &[&str] = &["https://youtube.com", "https://coursera.org"];
pub const TEMPLATE_NOTE: &str =
    "Focus on top missing skills and build small projects to demonstrate them.";
pub const NO_GAPS_NOTE: &str =
    "No gaps against the required skills were found. Keep building projects that show them.";

/// Cap on the model reply echoed back in `ai_raw`.
pub const RAW_REPLY_MAX_CHARS: usize = 6000;

const PLAN_PRIORITY_LIMIT: usize = 3;
const PLAN_ROADMAP_LIMIT: usize = 4;

#[derive(Debug, Error)]
pub enum ParseIssue {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("model output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model output JSON is not an object")]
    NotAnObject,
}

pub struct ResponseNormalizer {
    matcher: Arc<SkillMatcher>,
    required: RequiredSkills,
    weights: FitWeights,
}

impl ResponseNormalizer {
    pub fn new(matcher: Arc<SkillMatcher>, required: RequiredSkills, weights: FitWeights) -> Self {
        Self {
            matcher,
            required,
            weights,
        }
    }

    /// Normalizes with the default required-skills policy.
    pub fn normalize(&self, raw: Option<&str>, text: &ExtractedText) -> AnalysisReport {
        self.normalize_with(raw, text, &self.required)
    }

    /// `required` only affects the heuristic path; a usable model reply carries its
    /// own required skills.
    pub fn normalize_with(
        &self,
        raw: Option<&str>,
        text: &ExtractedText,
        required: &RequiredSkills,
    ) -> AnalysisReport {
        let Some(raw) = raw else {
            return self.heuristic_report(text, required);
        };

        let mut report = match extract_json_object(raw) {
            Ok(object) => self.model_report(&object, raw, text),
            Err(issue) => {
                warn!("Model output unusable, using heuristic analysis: {issue}");
                self.heuristic_report(text, required)
                    .with_diagnostic(DiagnosticCode::AiMalformedOutput, issue.to_string())
            }
        };
        report.ai_raw = raw.chars().take(RAW_REPLY_MAX_CHARS).collect();
        report
    }

    fn model_report(&self, object: &Map<String, Value>, raw: &str, text: &ExtractedText) -> AnalysisReport {
        let required = object
            .get("required_skills")
            .and_then(coerce_skill_list)
            .or_else(|| parse_skills_line(raw))
            .unwrap_or_default();

        let derived = self.matcher.compare(text.as_str(), &required);
        let skills = SkillMatch {
            matched: object
                .get("matched_skills")
                .and_then(coerce_skill_list)
                .unwrap_or(derived.matched),
            missing: object
                .get("missing_skills")
                .and_then(coerce_skill_list)
                .unwrap_or(derived.missing),
            required,
        };

        let salary = object
            .get("salary_range")
            .and_then(coerce_salary)
            .or_else(|| salary_from_text(raw))
            .unwrap_or(DEFAULT_SALARY);

        let distribution = object
            .get("salary_distribution")
            .and_then(coerce_distribution)
            .unwrap_or_else(|| synthesize_distribution(&salary));

        let demand_score = object
            .get("demand_score")
            .and_then(coerce_score)
            .or_else(|| demand_from_text(raw))
            .unwrap_or_else(|| default_demand(skills.matched.len()));

        let ats_score = object
            .get("ats")
            .or_else(|| object.get("ats_score"))
            .and_then(coerce_score);

        let plan = ["learning_plan", "ai_plan", "plan"]
            .iter()
            .find_map(|key| object.get(*key))
            .and_then(coerce_plan)
            .unwrap_or_else(|| template_plan(&skills));

        debug!(
            "Normalized model output: {} required, {} matched, {} missing",
            skills.required.len(),
            skills.matched.len(),
            skills.missing.len()
        );

        self.assemble(
            text,
            skills,
            salary,
            distribution,
            demand_score,
            ats_score,
            plan,
            AnalysisSource::Model,
        )
    }

    fn heuristic_report(&self, text: &ExtractedText, required: &RequiredSkills) -> AnalysisReport {
        let skills = self.matcher.match_skills(text.as_str(), required);
        let synthesis = synthesize(None, skills.matched.len());
        let plan = template_plan(&skills);

        self.assemble(
            text,
            skills,
            synthesis.salary,
            synthesis.distribution,
            synthesis.demand_score,
            None,
            plan,
            AnalysisSource::Heuristic,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        text: &ExtractedText,
        skills: SkillMatch,
        salary: SalaryEstimate,
        distribution: SalaryDistribution,
        demand_score: u8,
        ats_score: Option<u8>,
        plan: LearningPlan,
        source: AnalysisSource,
    ) -> AnalysisReport {
        let ratio = skills.match_ratio();
        let demand_score = demand_score.min(100);
        let ats_score = ats_score.unwrap_or_else(|| clamp_score(ratio * 100.0)).min(100);
        let fit_score = compute_fit_score(ratio, demand_score, &salary, &self.weights);

        AnalysisReport {
            resume_text: text.as_str().to_string(),
            required_skills: skills.required,
            matched_skills: skills.matched,
            missing_skills: skills.missing,
            salary_range: salary,
            salary_distribution: distribution,
            demand_score,
            ats_score,
            fit_score,
            ai_plan: plan,
            jobs: Vec::new(),
            source,
            ai_raw: String::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Parses the substring from the first `{` to the last `}` inclusive.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, ParseIssue> {
    let start = raw.find('{').ok_or(ParseIssue::NoJsonObject)?;
    let end = raw.rfind('}').ok_or(ParseIssue::NoJsonObject)?;
    if end < start {
        return Err(ParseIssue::NoJsonObject);
    }
    match serde_json::from_str::<Value>(&raw[start..=end])? {
        Value::Object(map) => Ok(map),
        _ => Err(ParseIssue::NotAnObject),
    }
}

/// Template plan over the top missing skills.
pub fn template_plan(skills: &SkillMatch) -> LearningPlan {
    let roadmap: BTreeMap<String, RoadmapEntry> = skills
        .missing
        .iter()
        .take(PLAN_ROADMAP_LIMIT)
        .map(|skill| {
            (
                skill.clone(),
                RoadmapEntry {
                    steps: TEMPLATE_STEPS.iter().map(|s| s.to_string()).collect(),
                    resources: TEMPLATE_RESOURCES.iter().map(|s| s.to_string()).collect(),
                },
            )
        })
        .collect();

    let short_note = if skills.missing.is_empty() {
        NO_GAPS_NOTE
    } else {
        TEMPLATE_NOTE
    };

    LearningPlan {
        priority: skills.missing.iter().take(PLAN_PRIORITY_LIMIT).cloned().collect(),
        roadmap,
        short_note: short_note.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Field coercion
// ────────────────────────────────────────────────────────────────────────────

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .take_while(|c| *c != '/' && *c != '%')
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn coerce_score(value: &Value) -> Option<u8> {
    coerce_number(value).map(clamp_score)
}

fn coerce_amount(value: &Value) -> Option<u64> {
    coerce_number(value).map(|n| n.max(0.0).round() as u64)
}

fn coerce_skill_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(normalize_skill_list(items.iter().filter_map(Value::as_str))),
        Value::String(s) => Some(normalize_skill_list(
            s.split(|c: char| matches!(c, ',' | ';' | '|' | '/' | '\n')),
        )),
        _ => None,
    }
}

fn coerce_text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn coerce_salary(value: &Value) -> Option<SalaryEstimate> {
    let object = value.as_object()?;
    let field = |key: &str| {
        object
            .get(key)
            .and_then(coerce_amount)
            .map(|n| n.min(MAX_SALARY_TOKEN))
    };
    let (min, median, max) = (field("min"), field("median"), field("max"));

    let min = min.or(median).or(max)?;
    let max = max.or(median).unwrap_or(min);
    let median = median.unwrap_or_else(|| {
        let (lo, hi) = (min.min(max), min.max(max));
        lo + (hi - lo) / 2
    });
    Some(SalaryEstimate::new(min, median, max))
}

fn coerce_distribution(value: &Value) -> Option<SalaryDistribution> {
    let object = value.as_object()?;
    let labels = object.get("labels")?.as_array()?;
    let counts = object.get("counts")?.as_array()?;

    let buckets: Vec<(String, u32)> = labels
        .iter()
        .zip(counts)
        .map(|(label, count)| {
            let label = match label {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let count = coerce_amount(count).unwrap_or(0).min(u64::from(u32::MAX)) as u32;
            (label, count)
        })
        .collect();

    if buckets.is_empty() {
        None
    } else {
        Some(SalaryDistribution::from_buckets(buckets))
    }
}

fn coerce_plan(value: &Value) -> Option<LearningPlan> {
    let object = value.as_object()?;

    let priority = object
        .get("priority")
        .and_then(coerce_skill_list)
        .unwrap_or_default();

    let roadmap: BTreeMap<String, RoadmapEntry> = object
        .get("roadmap")
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .map(|(skill, entry)| (skill.trim().to_lowercase(), coerce_roadmap_entry(entry)))
                .filter(|(skill, _)| !skill.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let short_note = match object.get("short_note") {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };

    Some(LearningPlan {
        priority,
        roadmap,
        short_note,
    })
}

fn coerce_roadmap_entry(value: &Value) -> RoadmapEntry {
    match value {
        Value::Object(entry) => RoadmapEntry {
            steps: entry.get("steps").map(coerce_text_list).unwrap_or_default(),
            resources: entry
                .get("resources")
                .map(coerce_text_list)
                .unwrap_or_default(),
        },
        // A bare list is read as the steps.
        other => RoadmapEntry {
            steps: coerce_text_list(other),
            resources: Vec::new(),
        },
    }
}
