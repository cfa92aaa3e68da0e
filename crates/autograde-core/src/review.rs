//! Manual review of automatically graded submissions.
//!
//! Short answers that are not an exact match are flagged for a human grader.
//! A reviewer confirms or overrides the awarded points per question, and the
//! submission totals are recomputed from the updated feedback.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GradingError;
use crate::grading::{GradingResult, QuestionFeedback};

/// Lifecycle of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Received but not graded (auto-grading disabled).
    Pending,
    /// Fully graded automatically.
    Graded,
    /// Graded, but at least one answer waits for a human grader.
    NeedsReview,
    /// A reviewer has confirmed or overridden the score.
    Reviewed,
}

impl SubmissionStatus {
    /// Status of a freshly auto-graded submission.
    pub fn for_result(result: &GradingResult) -> Self {
        if result.needs_manual_review() {
            SubmissionStatus::NeedsReview
        } else {
            SubmissionStatus::Graded
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Graded => write!(f, "graded"),
            SubmissionStatus::NeedsReview => write!(f, "needs review"),
            SubmissionStatus::Reviewed => write!(f, "reviewed"),
        }
    }
}

/// A reviewer's decision for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOverride {
    pub question_id: String,
    pub points_earned: f64,
    /// Replacement feedback text. Keeps the automatic text when absent.
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Apply reviewer overrides to a grading result.
///
/// Every overridden entry loses its review flag and is marked correct only
/// when it earns full points. Totals, percentage, and pass/fail are
/// recomputed from scratch. Fails without modifying anything if an override
/// names an unknown question or awards points outside `[0, max]`.
pub fn apply_review(
    result: &GradingResult,
    overrides: &[ReviewOverride],
    pass_score: u32,
) -> Result<GradingResult, GradingError> {
    let index: HashMap<&str, usize> = result
        .feedback
        .iter()
        .enumerate()
        .map(|(i, f)| (f.question_id.as_str(), i))
        .collect();

    let mut feedback: Vec<QuestionFeedback> = result.feedback.clone();

    for o in overrides {
        let Some(&i) = index.get(o.question_id.as_str()) else {
            return Err(GradingError::UnknownQuestion(o.question_id.clone()));
        };
        let entry = &mut feedback[i];

        if !o.points_earned.is_finite() || o.points_earned < 0.0 || o.points_earned > entry.max_points
        {
            return Err(GradingError::PointsOutOfRange {
                question_id: o.question_id.clone(),
                points: o.points_earned,
                max: entry.max_points,
            });
        }

        entry.points_earned = o.points_earned;
        entry.correct = Some(o.points_earned == entry.max_points);
        entry.requires_manual_review = false;
        if let Some(text) = &o.feedback {
            entry.feedback = text.clone();
        }
    }

    Ok(GradingResult::from_feedback(feedback, pass_score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::grade_submission;
    use crate::model::{Difficulty, Question, QuestionKind, Worksheet};
    use serde_json::json;

    fn worksheet() -> Worksheet {
        Worksheet {
            id: "ws".into(),
            title: "Vocabulary".into(),
            description: String::new(),
            subject: None,
            grade_level: None,
            difficulty: Difficulty::Beginner,
            estimated_time: None,
            auto_grade: true,
            pass_score: Some(70),
            questions: vec![
                Question {
                    id: "q1".into(),
                    prompt: String::new(),
                    points: 5.0,
                    kind: QuestionKind::ShortAnswer {
                        correct_answer: "photosynthesis".into(),
                        case_sensitive: false,
                    },
                },
                Question {
                    id: "q2".into(),
                    prompt: String::new(),
                    points: 5.0,
                    kind: QuestionKind::MultipleChoice {
                        options: vec![],
                        correct_answer: 0,
                    },
                },
            ],
        }
    }

    fn graded() -> GradingResult {
        grade_submission(&worksheet(), &json!({"q1": "light energy", "q2": 0})).unwrap()
    }

    #[test]
    fn status_for_result() {
        let result = graded();
        assert_eq!(SubmissionStatus::for_result(&result), SubmissionStatus::NeedsReview);

        let clean = grade_submission(&worksheet(), &json!({"q1": "Photosynthesis"})).unwrap();
        assert_eq!(SubmissionStatus::for_result(&clean), SubmissionStatus::Graded);
        assert_eq!(SubmissionStatus::NeedsReview.to_string(), "needs review");
    }

    #[test]
    fn override_recomputes_totals() {
        let result = graded();
        assert_eq!(result.score, 5.0);
        assert!(!result.passed);

        let reviewed = apply_review(
            &result,
            &[ReviewOverride {
                question_id: "q1".into(),
                points_earned: 5.0,
                feedback: Some("Accepted: equivalent wording".into()),
            }],
            70,
        )
        .unwrap();

        assert_eq!(reviewed.score, 10.0);
        assert_eq!(reviewed.percentage, 100);
        assert!(reviewed.passed);
        assert!(!reviewed.needs_manual_review());
        assert_eq!(reviewed.feedback[0].correct, Some(true));
        assert_eq!(reviewed.feedback[0].feedback, "Accepted: equivalent wording");
        // untouched entries keep their automatic outcome
        assert_eq!(reviewed.feedback[1], result.feedback[1]);
    }

    #[test]
    fn partial_override_is_not_correct() {
        let reviewed = apply_review(
            &graded(),
            &[ReviewOverride {
                question_id: "q1".into(),
                points_earned: 2.5,
                feedback: None,
            }],
            70,
        )
        .unwrap();
        assert_eq!(reviewed.feedback[0].correct, Some(false));
        assert_eq!(reviewed.score, 7.5);
        assert_eq!(reviewed.percentage, 75);
        assert_eq!(
            reviewed.feedback[0].feedback,
            "Incorrect. Flagged for manual review."
        );
    }

    #[test]
    fn unknown_question_is_rejected() {
        let err = apply_review(
            &graded(),
            &[ReviewOverride {
                question_id: "q9".into(),
                points_earned: 1.0,
                feedback: None,
            }],
            70,
        )
        .unwrap_err();
        assert_eq!(err, GradingError::UnknownQuestion("q9".into()));
    }

    #[test]
    fn out_of_range_points_are_rejected() {
        for points in [-1.0, 5.5, f64::NAN] {
            let err = apply_review(
                &graded(),
                &[ReviewOverride {
                    question_id: "q1".into(),
                    points_earned: points,
                    feedback: None,
                }],
                70,
            )
            .unwrap_err();
            assert!(matches!(err, GradingError::PointsOutOfRange { .. }));
        }
    }
}
