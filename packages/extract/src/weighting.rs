//! Weighted final grade computation.
//!
//! The weighting policy depends on which inputs a course actually has. The
//! policy table is plain data, evaluated top to bottom; the first row whose
//! availability pattern matches is applied.

use notas_grades_models::{CourseAggregate, CourseStatus, Weights};

use crate::numeric::{mean, round1};

/// One row of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub has_lab: bool,
    pub has_exam: bool,
    pub weights: Weights,
}

/// Weighting policies in priority order.
pub const POLICIES: &[Policy] = &[
    Policy {
        has_lab: false,
        has_exam: true,
        weights: Weights::new(100, 0, 30),
    },
    Policy {
        has_lab: true,
        has_exam: false,
        weights: Weights::new(80, 20, 0),
    },
    Policy {
        has_lab: false,
        has_exam: false,
        weights: Weights::new(100, 0, 0),
    },
    Policy {
        has_lab: true,
        has_exam: true,
        weights: Weights::new(80, 20, 30),
    },
];

/// Returns the first policy matching the available inputs.
#[must_use]
pub fn select_policy(has_lab: bool, has_exam: bool) -> Weights {
    POLICIES
        .iter()
        .find(|p| p.has_lab == has_lab && p.has_exam == has_exam)
        .map_or(Weights::new(100, 0, 0), |p| p.weights)
}

/// The averages a course's final grade is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightInputs {
    pub partial_average: Option<f64>,
    pub lab_average: Option<f64>,
    pub exam_score: Option<f64>,
}

impl WeightInputs {
    /// Reads the inputs of an aggregate. A reported average takes
    /// precedence over the mean of the individual scores.
    #[must_use]
    pub fn from_aggregate(course: &CourseAggregate) -> Self {
        Self {
            partial_average: course
                .theory
                .reported_partial_average
                .or_else(|| mean(&course.theory.partial_scores)),
            lab_average: course
                .lab
                .reported_lab_average
                .or_else(|| mean(&course.lab.lab_scores)),
            exam_score: course.theory.exam_score,
        }
    }
}

/// Result of grading one course.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeOutcome {
    pub computed_final: Option<f64>,
    pub weights: Weights,
    pub status: CourseStatus,
}

/// Computes the weighted final grade of a set of inputs.
///
/// Absent operands count as 0 in the weighted sums; the selected policy
/// always gives them weight 0. Returns `None` for the grade when both the
/// partial and lab averages are absent.
#[must_use]
pub fn weighted_final(inputs: WeightInputs) -> (Option<f64>, Weights) {
    let weights = select_policy(inputs.lab_average.is_some(), inputs.exam_score.is_some());
    if inputs.partial_average.is_none() && inputs.lab_average.is_none() {
        return (None, weights);
    }

    let partial = inputs.partial_average.unwrap_or(0.0);
    let exam = inputs.exam_score.unwrap_or(0.0);
    let lab = inputs.lab_average.unwrap_or(0.0);

    let theory_inside = partial.mul_add(
        f64::from(weights.partial_weight_inside_theory()),
        exam * f64::from(weights.exam_weight_inside_theory),
    ) / 100.0;
    let total = theory_inside.mul_add(
        f64::from(weights.theory_weight),
        lab * f64::from(weights.lab_weight),
    ) / 100.0;

    (Some(round1(total)), weights)
}

/// Derives the status of a course. The reported final grade always takes
/// precedence over the computed one.
#[must_use]
pub fn derive_status(reported_final: Option<f64>, computed_final: Option<f64>) -> CourseStatus {
    reported_final
        .or(computed_final)
        .map_or(CourseStatus::Cursando, CourseStatus::from_grade)
}

/// Computes the final grade, policy and status of a course.
#[must_use]
pub fn compute_final(course: &CourseAggregate) -> GradeOutcome {
    let (computed_final, weights) = weighted_final(WeightInputs::from_aggregate(course));
    GradeOutcome {
        computed_final,
        weights,
        status: derive_status(course.reported_final, computed_final),
    }
}

/// Grades a merged course, filling in its computed fields.
#[must_use]
pub fn grade(mut course: CourseAggregate) -> CourseAggregate {
    let outcome = compute_final(&course);
    course.computed_final = outcome.computed_final;
    course.weights_used = Some(outcome.weights);
    course.status = outcome.status;
    course
}

#[cfg(test)]
mod tests {
    use notas_grades_models::{LabComponent, Semester, TheoryComponent};

    use super::*;

    fn course() -> CourseAggregate {
        CourseAggregate {
            code: "MAT-1001".to_string(),
            name: "Cálculo I".to_string(),
            period_year: 2024,
            period_semester: Semester::First,
            attendance_percent: None,
            theory: TheoryComponent::default(),
            lab: LabComponent::default(),
            reported_final: None,
            reported_status: None,
            computed_final: None,
            weights_used: None,
            status: CourseStatus::Cursando,
        }
    }

    #[test]
    fn policy_table_covers_every_combination() {
        assert_eq!(select_policy(false, true), Weights::new(100, 0, 30));
        assert_eq!(select_policy(true, false), Weights::new(80, 20, 0));
        assert_eq!(select_policy(false, false), Weights::new(100, 0, 0));
        assert_eq!(select_policy(true, true), Weights::new(80, 20, 30));
    }

    #[test]
    fn theory_with_exam_and_no_lab() {
        let (grade, weights) = weighted_final(WeightInputs {
            partial_average: Some(5.0),
            lab_average: None,
            exam_score: Some(6.0),
        });
        assert_eq!(weights, Weights::new(100, 0, 30));
        assert_eq!(grade, Some(5.3));
    }

    #[test]
    fn lab_without_exam() {
        let (grade, _) = weighted_final(WeightInputs {
            partial_average: Some(4.0),
            lab_average: Some(6.0),
            exam_score: None,
        });
        // 4.0 * 0.8 + 6.0 * 0.2
        assert_eq!(grade, Some(4.4));
    }

    #[test]
    fn all_inputs_present() {
        let (grade, _) = weighted_final(WeightInputs {
            partial_average: Some(5.0),
            lab_average: Some(7.0),
            exam_score: Some(3.0),
        });
        // theory 4.4, then 4.4 * 0.8 + 7.0 * 0.2
        assert_eq!(grade, Some(4.9));
    }

    #[test]
    fn exam_alone_yields_no_grade() {
        let (grade, weights) = weighted_final(WeightInputs {
            partial_average: None,
            lab_average: None,
            exam_score: Some(6.0),
        });
        assert_eq!(grade, None);
        assert_eq!(weights, Weights::new(100, 0, 30));
    }

    #[test]
    fn reported_averages_take_precedence() {
        let mut c = course();
        c.theory.partial_scores = vec![2.0, 3.0];
        c.theory.reported_partial_average = Some(5.5);
        c.lab.lab_scores = vec![6.0, 7.0];

        let inputs = WeightInputs::from_aggregate(&c);
        assert_eq!(inputs.partial_average, Some(5.5));
        assert_eq!(inputs.lab_average, Some(6.5));
    }

    #[test]
    fn reported_final_wins_for_status() {
        assert_eq!(derive_status(Some(3.9), Some(5.0)), CourseStatus::Reprobado);
        assert_eq!(derive_status(None, Some(4.0)), CourseStatus::Aprobado);
        assert_eq!(derive_status(None, None), CourseStatus::Cursando);
    }

    #[test]
    fn grades_course_in_place() {
        let mut c = course();
        c.theory.partial_scores = vec![5.0, 6.0];
        c.theory.exam_score = Some(4.5);

        let graded = grade(c);
        // partial mean 5.5; (5.5 * 70 + 4.5 * 30) / 100
        assert_eq!(graded.computed_final, Some(5.2));
        assert_eq!(graded.weights_used, Some(Weights::new(100, 0, 30)));
        assert_eq!(graded.status, CourseStatus::Aprobado);
    }

    #[test]
    fn course_without_scores_is_in_progress() {
        let graded = grade(course());
        assert_eq!(graded.computed_final, None);
        assert_eq!(graded.status, CourseStatus::Cursando);
        assert_eq!(graded.weights_used, Some(Weights::new(100, 0, 0)));
    }
}
