// All LLM prompt constants for the Analysis module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{ESTIMATE_DISCLAIMER, JSON_ONLY_SYSTEM};

/// Role half of the system prompt; the JSON-only fragment is appended.
pub const ANALYSIS_SYSTEM: &str = "You are an assistant that extracts skills from résumés \
    and estimates salary and hiring demand in INR for the India market.";

/// Résumé analysis prompt template. Replace `{disclaimer}` and `{resume_text}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"From the résumé text below, produce a career analysis.

Return a JSON object with this EXACT schema (no extra fields):
{
  "ats": 72,
  "required_skills": ["python", "sql", "power bi"],
  "matched_skills": ["python", "sql"],
  "missing_skills": ["power bi"],
  "salary_range": {"min": 400000, "median": 650000, "max": 900000},
  "salary_distribution": {
    "labels": ["₹4-5L", "₹5-6L", "₹6-7L", "₹7-9L"],
    "counts": [3, 6, 4, 2]
  },
  "demand_score": 68,
  "learning_plan": {
    "priority": ["power bi"],
    "roadmap": {
      "power bi": {
        "steps": ["Learn data modelling basics", "Build a sales dashboard", "Add it to the résumé"],
        "resources": ["https://learn.microsoft.com/power-bi/"]
      }
    },
    "short_note": "One or two sentences of advice."
  }
}

Rules:
- "ats": 0-100 estimate of how well the résumé reads for the role it targets.
- "required_skills": the top technical/role skills for that role, lower-case.
- "matched_skills" / "missing_skills": which required skills the résumé shows or lacks.
- "salary_range": realistic annual salary in Indian rupees (INR) for this candidate in India; min <= median <= max.
- "demand_score": 0-100 hiring demand for this role in India.
- "learning_plan.priority": at most 3 missing skills, most important first.
- {disclaimer}

RÉSUMÉ:
{resume_text}"#;

pub fn analysis_system() -> String {
    format!("{ANALYSIS_SYSTEM} {JSON_ONLY_SYSTEM}")
}

pub fn build_analysis_prompt(resume_text: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{disclaimer}", ESTIMATE_DISCLAIMER)
        .replace("{resume_text}", resume_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_text_and_schema() {
        let prompt = build_analysis_prompt("Jane Doe, data analyst");
        assert!(prompt.ends_with("Jane Doe, data analyst"));
        assert!(prompt.contains("\"salary_range\""));
        assert!(prompt.contains("\"learning_plan\""));
        assert!(!prompt.contains("{resume_text}"));
        assert!(!prompt.contains("{disclaimer}"));
    }

    #[test]
    fn test_system_prompt_demands_json() {
        assert!(analysis_system().contains("valid JSON"));
    }
}
