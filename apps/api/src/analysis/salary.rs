//! Salary/Demand Synthesizer: heuristic salary range, bucketed spread and demand
//! score for when no authoritative figure is available.
//!
//! None of this is market data. Distribution counts are a fixed decreasing shape.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::scoring::clamp_score;
use crate::models::report::{SalaryDistribution, SalaryEstimate};

/// Annual INR band used when nothing better is known.
pub const DEFAULT_SALARY: SalaryEstimate = SalaryEstimate {
    min: 300_000,
    median: 600_000,
    max: 1_200_000,
};

/// Numeric tokens outside this range are page numbers, years, phone numbers, ...
pub const MIN_SALARY_TOKEN: u64 = 10_000;
pub const MAX_SALARY_TOKEN: u64 = 50_000_000;

pub const BUCKET_COUNT: u64 = 4;

pub const DEMAND_WITH_SKILLS: u8 = 60;
pub const DEMAND_WITHOUT_SKILLS: u8 = 40;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").unwrap());
static DEMAND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3})\s*/\s*100\b").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub salary: SalaryEstimate,
    pub distribution: SalaryDistribution,
    pub demand_score: u8,
}

/// Builds all three outputs from whatever signal is available: free text to scan
/// for figures (may be absent) and the number of matched skills.
pub fn synthesize(text: Option<&str>, matched_skills: usize) -> Synthesis {
    let salary = text.and_then(salary_from_text).unwrap_or(DEFAULT_SALARY);
    let demand_score = text
        .and_then(demand_from_text)
        .unwrap_or_else(|| default_demand(matched_skills));
    Synthesis {
        distribution: synthesize_distribution(&salary),
        salary,
        demand_score,
    }
}

/// Scans for integer-like tokens ("6,00,000", "1200000") within the salary range;
/// `None` when no token qualifies.
pub fn salary_from_text(text: &str) -> Option<SalaryEstimate> {
    let values: Vec<u64> = NUMBER_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', "").parse::<u64>().ok())
        .filter(|n| (MIN_SALARY_TOKEN..=MAX_SALARY_TOKEN).contains(n))
        .collect();

    let min = *values.iter().min()?;
    let max = *values.iter().max()?;
    Some(SalaryEstimate::new(min, (min + max) / 2, max))
}

/// Splits `[min, max]` into equal-width contiguous buckets labelled in lakhs.
pub fn synthesize_distribution(salary: &SalaryEstimate) -> SalaryDistribution {
    let width = ((salary.max - salary.min) / BUCKET_COUNT).max(1);
    let buckets = (0..BUCKET_COUNT)
        .map(|i| {
            let start = salary.min.saturating_add(i.saturating_mul(width));
            let end = if i == BUCKET_COUNT - 1 {
                salary.max.max(start)
            } else {
                start.saturating_add(width)
            };
            let label = format!("₹{}-{}L", start / 100_000, end / 100_000);
            let count = 6u32.saturating_sub(i as u32).max(1);
            (label, count)
        })
        .collect();
    SalaryDistribution::from_buckets(buckets)
}

/// Reads an explicit "NN/100" figure, clamped to 100.
pub fn demand_from_text(text: &str) -> Option<u8> {
    let caps = DEMAND_RE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(clamp_score(value))
}

pub fn default_demand(matched_skills: usize) -> u8 {
    if matched_skills > 0 {
        DEMAND_WITH_SKILLS
    } else {
        DEMAND_WITHOUT_SKILLS
    }
}
