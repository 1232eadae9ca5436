use serde::{Deserialize, Serialize};

use crate::models::report::SalaryEstimate;

/// Linear weights of the composite fit score. Tunable, not validated constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitWeights {
    pub skills: f64,
    pub demand: f64,
    pub salary: f64,
    pub constant: f64,
}

impl Default for FitWeights {
    fn default() -> Self {
        Self {
            skills: 0.6,
            demand: 0.2,
            salary: 0.1,
            constant: 10.0,
        }
    }
}

/// fit = skills·ratio·100 + demand·demand_score + salary·position·100 + constant,
/// rounded and clamped to 0..=100.
pub fn compute_fit_score(
    skill_match_ratio: f64,
    demand_score: u8,
    salary: &SalaryEstimate,
    weights: &FitWeights,
) -> u8 {
    let raw = weights.skills * skill_match_ratio.clamp(0.0, 1.0) * 100.0
        + weights.demand * f64::from(demand_score)
        + weights.salary * salary.median_position() * 100.0
        + weights.constant;
    clamp_score(raw)
}

/// Rounds into the 0..=100 score range. NaN maps to 0.
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_score_full() {
        let w = FitWeights::default();
        let salary = SalaryEstimate::new(0, 100, 100);
        // 0.6*100 + 0.2*100 + 0.1*100 + 10 = 100
        assert_eq!(compute_fit_score(1.0, 100, &salary, &w), 100);
    }

    #[test]
    fn test_fit_score_partial() {
        let w = FitWeights::default();
        let salary = SalaryEstimate::new(300_000, 600_000, 1_200_000);
        // 0.6*50 + 0.2*60 + 0.1*(1/3*100) + 10 = 30 + 12 + 3.33 + 10 = 55.33
        assert_eq!(compute_fit_score(0.5, 60, &salary, &w), 55);
    }

    #[test]
    fn test_fit_score_clamped() {
        let w = FitWeights {
            skills: 2.0,
            demand: 1.0,
            salary: 1.0,
            constant: 50.0,
        };
        let salary = SalaryEstimate::new(1, 1, 1);
        assert_eq!(compute_fit_score(1.0, 100, &salary, &w), 100);

        let negative = FitWeights {
            constant: -500.0,
            ..FitWeights::default()
        };
        assert_eq!(compute_fit_score(0.0, 0, &salary, &negative), 0);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(49.5), 50);
        assert_eq!(clamp_score(180.0), 100);
        assert_eq!(clamp_score(f64::NAN), 0);
    }
}
