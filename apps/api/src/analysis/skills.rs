//! Skill Heuristic Matcher: vocabulary presence test with no external call.
//!
//! Matching is case-insensitive substring containment. That false-positives on
//! short or common terms, so the terms in `BOUNDARY_TOKENS` are matched at word
//! boundaries instead. Everything else keeps plain containment, e.g. "sql" is found
//! inside "postgresql".

use once_cell::sync::Lazy;
use regex::Regex;

/// Known skill terms, in reporting order.
pub const SKILL_VOCABULARY: &[&str] = &[
    "python",
    "sql",
    "excel",
    "power bi",
    "powerbi",
    "tableau",
    "aws",
    "azure",
    "docker",
    "kubernetes",
    "pandas",
    "numpy",
    "r",
    "java",
    "javascript",
    "spark",
    "hadoop",
    "machine learning",
    "deep learning",
    "statistics",
    "git",
    "react",
    "go",
    "c",
];

/// Terms that collide with ordinary words or longer terms ("r" in "their",
/// "java" in "javascript", "excel" in "excellent").
pub const BOUNDARY_TOKENS: &[&str] = &["r", "c", "go", "java", "excel", "aws"];

/// Role skills used as the `required` set when no role is supplied.
pub const DEFAULT_ROLE_SKILLS: &[&str] = &[
    "python",
    "sql",
    "excel",
    "power bi",
    "tableau",
    "statistics",
    "machine learning",
];

static SKILLS_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[\s*#\-\d.)]*(?:top\s+)?skills\s*[:\-]\s*(.+)$").unwrap());
static SKILL_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;|/]+").unwrap());

/// How the `required` set is chosen for a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredSkills {
    /// The first N matched terms; nothing can be missing.
    TopMatched(usize),
    /// A fixed role list; missing = role skills not found in the text.
    Role(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillMatch {
    pub required: Vec<String>,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl SkillMatch {
    /// Fraction of required skills that were matched, 0.0 when nothing is required.
    pub fn match_ratio(&self) -> f64 {
        if self.required.is_empty() {
            return 0.0;
        }
        let hit = self
            .required
            .iter()
            .filter(|s| self.matched.contains(s))
            .count();
        hit as f64 / self.required.len() as f64
    }
}

enum Matcher {
    Contains,
    WordBoundary(Regex),
}

struct Term {
    skill: String,
    matcher: Matcher,
}

/// Read-only after construction; shared across requests.
pub struct SkillMatcher {
    terms: Vec<Term>,
}

impl SkillMatcher {
    pub fn new<S: AsRef<str>>(vocabulary: &[S]) -> Self {
        let mut terms: Vec<Term> = Vec::new();
        for raw in vocabulary {
            let skill = raw.as_ref().trim().to_lowercase();
            if skill.is_empty() || terms.iter().any(|t| t.skill == skill) {
                continue;
            }
            let matcher = term_matcher(&skill);
            terms.push(Term { skill, matcher });
        }
        Self { terms }
    }

    pub fn with_default_vocabulary() -> Self {
        Self::new(SKILL_VOCABULARY)
    }

    #[cfg(test)]
    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.skill.as_str())
    }

    /// Vocabulary terms present in `text`, in vocabulary order.
    pub fn find(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.terms
            .iter()
            .filter(|t| t.is_in(&lower))
            .map(|t| t.skill.clone())
            .collect()
    }

    pub fn match_skills(&self, text: &str, required: &RequiredSkills) -> SkillMatch {
        let found = self.find(text);
        match required {
            RequiredSkills::TopMatched(n) => {
                let required: Vec<String> = found.iter().take(*n).cloned().collect();
                SkillMatch {
                    matched: required.clone(),
                    required,
                    missing: Vec::new(),
                }
            }
            RequiredSkills::Role(role) => {
                // Every vocabulary hit counts as matched; the role only decides
                // what is required and therefore what can be missing.
                let mut result = self.compare(text, role);
                let mut matched = found;
                for skill in result.matched.drain(..) {
                    if !matched.contains(&skill) {
                        matched.push(skill);
                    }
                }
                result.matched = matched;
                result
            }
        }
    }

    /// Splits `required` into the terms present in `text` and those absent.
    /// Terms outside the vocabulary are tested by plain containment.
    pub fn compare(&self, text: &str, required: &[String]) -> SkillMatch {
        let lower = text.to_lowercase();
        let required = normalize_skill_list(required.iter().map(String::as_str));
        let (matched, missing): (Vec<String>, Vec<String>) =
            required.iter().cloned().partition(|skill| {
                match self.terms.iter().find(|t| &t.skill == skill) {
                    Some(term) => term.is_in(&lower),
                    None => lower.contains(skill.as_str()),
                }
            });
        SkillMatch {
            required,
            matched,
            missing,
        }
    }
}

impl Term {
    fn is_in(&self, lower_text: &str) -> bool {
        match &self.matcher {
            Matcher::Contains => lower_text.contains(self.skill.as_str()),
            Matcher::WordBoundary(re) => re.is_match(lower_text),
        }
    }
}

fn term_matcher(skill: &str) -> Matcher {
    if BOUNDARY_TOKENS.contains(&skill) {
        if let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(skill))) {
            return Matcher::WordBoundary(re);
        }
    }
    Matcher::Contains
}

/// Lower-cases, trims and deduplicates, keeping first-seen order.
pub fn normalize_skill_list<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let skill = item
            .trim()
            .trim_matches(|c: char| c == '.' || c == '*')
            .trim()
            .to_lowercase();
        if !skill.is_empty() && !out.contains(&skill) {
            out.push(skill);
        }
    }
    out
}

/// Recovers a skill list from a "Skills: a, b, c" / "Top skills - a; b" line.
pub fn parse_skills_line(text: &str) -> Option<Vec<String>> {
    let caps = SKILLS_LINE_RE.captures(text)?;
    let skills = normalize_skill_list(SKILL_SPLIT_RE.split(caps.get(1)?.as_str()));
    if skills.is_empty() {
        None
    } else {
        Some(skills)
    }
}
