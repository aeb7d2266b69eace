//! Grade arithmetic.
//!
//! A Level 1 reviewer grades a submission on a 1.0–5.0 scale. The grade is
//! converted into an effective score proportional to the task's weight in its
//! parent milestone, and from there into per-KPI contributions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};
use crate::state_machine::KpiLink;

pub const MIN_GRADE: f64 = 1.0;
pub const MAX_GRADE: f64 = 5.0;
pub const MAX_WEIGHT: f64 = 100.0;

/// Converts a raw grade and a task weight into the weighted score a task
/// contributes to its milestone.
///
/// `effective_score = (grade / 5.0) * task_weight`. A weight of 0 (personal
/// or standalone task) always yields 0.
pub fn effective_score(grade: f64, task_weight: f64) -> Result<f64> {
    validate_grade(grade)?;
    validate_weight(task_weight)?;
    if task_weight == 0.0 {
        return Ok(0.0);
    }
    Ok((grade / MAX_GRADE) * task_weight)
}

pub fn validate_grade(grade: f64) -> Result<()> {
    if !grade.is_finite() || !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return Err(WorkflowError::validation(format!(
            "grade {grade} is outside {MIN_GRADE:.1}-{MAX_GRADE:.1}"
        )));
    }
    Ok(())
}

pub fn validate_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || !(0.0..=MAX_WEIGHT).contains(&weight) {
        return Err(WorkflowError::validation(format!(
            "weight {weight} is outside 0-{MAX_WEIGHT}"
        )));
    }
    Ok(())
}

/// The weighted share of an effective score credited to one linked KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiContribution {
    pub kpi_title: String,
    pub value: f64,
}

pub fn kpi_contributions(effective_score: f64, kpis: &[KpiLink]) -> Vec<KpiContribution> {
    kpis.iter()
        .map(|kpi| KpiContribution {
            kpi_title: kpi.kpi_title.clone(),
            value: effective_score * kpi.kpi_weight / MAX_WEIGHT,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn score_follows_formula() {
        assert!(close(effective_score(4.0, 40.0).unwrap(), 32.0));
        assert!(close(effective_score(3.0, 100.0).unwrap(), 60.0));
        assert!(close(effective_score(5.0, 100.0).unwrap(), 100.0));
        assert!(close(effective_score(1.0, 10.0).unwrap(), 2.0));
    }

    #[test]
    fn keeps_fractional_precision() {
        assert!(close(effective_score(3.7, 33.0).unwrap(), 24.42));
    }

    #[test]
    fn zero_weight_scores_zero() {
        for g in [1.0, 2.5, 3.3, 5.0] {
            assert_eq!(effective_score(g, 0.0).unwrap(), 0.0);
        }
    }

    #[test]
    fn monotonic_in_grade_and_weight() {
        let grades = [1.0, 1.5, 2.0, 2.8, 3.0, 4.1, 5.0];
        let weights = [0.0, 1.0, 25.0, 50.0, 99.9, 100.0];
        for w in weights {
            for pair in grades.windows(2) {
                assert!(
                    effective_score(pair[0], w).unwrap() <= effective_score(pair[1], w).unwrap()
                );
            }
        }
        for g in grades {
            for pair in weights.windows(2) {
                assert!(
                    effective_score(g, pair[0]).unwrap() <= effective_score(g, pair[1]).unwrap()
                );
            }
        }
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        for (g, w) in [(0.9, 50.0), (5.1, 50.0), (3.0, -1.0), (3.0, 100.5), (f64::NAN, 10.0)] {
            let err = effective_score(g, w).unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)), "{g} {w}");
        }
    }

    #[test]
    fn kpi_contributions_scale_by_kpi_weight() {
        let kpis = vec![
            KpiLink {
                kpi_title: "Uptime".into(),
                kpi_weight: 50.0,
            },
            KpiLink {
                kpi_title: "Latency".into(),
                kpi_weight: 25.0,
            },
        ];
        let out = kpi_contributions(32.0, &kpis);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kpi_title, "Uptime");
        assert!(close(out[0].value, 16.0));
        assert!(close(out[1].value, 8.0));
    }
}
