//! The grading engine.
//!
//! Scores a submitted [`AnswerSet`] against a [`Worksheet`]'s answer key. Each
//! question kind has its own rule; multiple-choice and checkbox are
//! all-or-nothing, short-answer, matching, and ordering can award partial
//! credit. Grading is a pure computation: the same inputs always produce the
//! same [`GradingResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GradingError;
use crate::model::{Answer, AnswerSet, MatchPair, Question, QuestionKind, Worksheet};
use crate::similarity::similarity;

/// Pass score used when a worksheet does not set one.
pub const DEFAULT_PASS_SCORE: u32 = 70;

/// Minimum similarity for a short answer to earn partial credit.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Tunable grading constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingPolicy {
    /// Minimum normalized similarity for short-answer partial credit.
    pub similarity_threshold: f64,
    /// Pass score for worksheets that do not define one.
    pub default_pass_score: u32,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            default_pass_score: DEFAULT_PASS_SCORE,
        }
    }
}

/// Outcome for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    pub question_id: String,
    /// `None` when correctness has not been decided.
    pub correct: Option<bool>,
    pub points_earned: f64,
    pub max_points: f64,
    pub feedback: String,
    #[serde(default)]
    pub requires_manual_review: bool,
}

/// Score for a whole submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    /// Sum of points earned.
    pub score: f64,
    /// Sum of authored points.
    pub max_score: f64,
    /// `round(score / max_score * 100)`, or 0 when `max_score` is 0.
    pub percentage: u32,
    /// Whether `percentage` reached the pass score.
    pub passed: bool,
    /// One entry per question, in authored order.
    pub feedback: Vec<QuestionFeedback>,
}

impl GradingResult {
    /// Build a result from per-question feedback, recomputing every total.
    pub fn from_feedback(feedback: Vec<QuestionFeedback>, pass_score: u32) -> Self {
        let score: f64 = feedback.iter().map(|f| f.points_earned).sum();
        let max_score: f64 = feedback.iter().map(|f| f.max_points).sum();
        let percentage = percentage(score, max_score);

        Self {
            score,
            max_score,
            percentage,
            passed: percentage >= pass_score,
            feedback,
        }
    }

    /// Returns `true` if any question is waiting for a human grader.
    pub fn needs_manual_review(&self) -> bool {
        self.feedback.iter().any(|f| f.requires_manual_review)
    }
}

fn percentage(score: f64, max_score: f64) -> u32 {
    if max_score > 0.0 {
        ((score / max_score) * 100.0).round().clamp(0.0, 100.0) as u32
    } else {
        0
    }
}

/// Feedback entries that need a human grader.
pub fn questions_for_manual_review(feedback: &[QuestionFeedback]) -> Vec<&QuestionFeedback> {
    feedback
        .iter()
        .filter(|f| f.requires_manual_review)
        .collect()
}

/// Grade a submission with the default policy.
///
/// Fails with [`GradingError::InvalidInput`] if `answers` is not a mapping.
pub fn grade_submission(worksheet: &Worksheet, answers: &Value) -> Result<GradingResult, GradingError> {
    Grader::default().grade_submission(worksheet, answers)
}

/// Grade a single question with the default policy.
pub fn grade_question(question: &Question, answer: Option<&Value>) -> QuestionFeedback {
    Grader::default().grade_question(question, answer)
}

/// Stateless grader parameterized by a [`GradingPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Grader {
    policy: GradingPolicy,
}

impl Grader {
    pub fn new(policy: GradingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    /// The pass score that applies to `worksheet`.
    pub fn pass_score(&self, worksheet: &Worksheet) -> u32 {
        worksheet
            .pass_score
            .unwrap_or(self.policy.default_pass_score)
    }

    /// Grade a raw answer document against a worksheet.
    pub fn grade_submission(
        &self,
        worksheet: &Worksheet,
        answers: &Value,
    ) -> Result<GradingResult, GradingError> {
        let answers = AnswerSet::try_from(answers)?;
        Ok(self.grade_answers(worksheet, &answers))
    }

    /// Grade an already validated answer set.
    pub fn grade_answers(&self, worksheet: &Worksheet, answers: &AnswerSet) -> GradingResult {
        let feedback: Vec<QuestionFeedback> = worksheet
            .questions
            .iter()
            .map(|q| self.grade_question(q, answers.get(&q.id)))
            .collect();

        let result = GradingResult::from_feedback(feedback, self.pass_score(worksheet));

        tracing::info!(
            "graded submission for '{}': {}/{} ({}%)",
            worksheet.id,
            result.score,
            result.max_score,
            result.percentage
        );

        result
    }

    /// Grade one question. `None` means the question was not answered.
    pub fn grade_question(&self, question: &Question, answer: Option<&Value>) -> QuestionFeedback {
        let outcome = match answer {
            None if question.kind.is_gradable() => Outcome::unanswered(),
            _ => self.score(question, answer),
        };

        let max_points = question.points.max(0.0);
        let points_earned = outcome.points_earned.clamp(0.0, max_points);

        tracing::debug!(
            "question '{}' ({}): {}/{}",
            question.id,
            question.kind,
            points_earned,
            max_points
        );

        QuestionFeedback {
            question_id: question.id.clone(),
            correct: Some(outcome.correct),
            points_earned,
            max_points,
            feedback: outcome.feedback,
            requires_manual_review: outcome.requires_manual_review,
        }
    }

    fn score(&self, question: &Question, raw: Option<&Value>) -> Outcome {
        let points = question.points.max(0.0);
        let coerced = raw.map(|v| Answer::coerce(&question.kind, v));

        match (&question.kind, coerced) {
            (
                QuestionKind::MultipleChoice {
                    options,
                    correct_answer,
                },
                answer,
            ) => {
                let chosen = match answer {
                    Some(Ok(Answer::Choice(i))) => Some(i),
                    _ => None,
                };
                grade_multiple_choice(options, *correct_answer, chosen, points)
            }
            (QuestionKind::Checkbox { correct_answers, .. }, Some(Ok(Answer::Selection(s)))) => {
                grade_checkbox(correct_answers, &s, points)
            }
            (
                QuestionKind::ShortAnswer {
                    correct_answer,
                    case_sensitive,
                },
                Some(Ok(Answer::Text(text))),
            ) => self.grade_short_answer(correct_answer, *case_sensitive, &text, points),
            (QuestionKind::Matching { pairs }, Some(Ok(Answer::Matches(m)))) => {
                grade_matching(pairs, &m, points)
            }
            (QuestionKind::Ordering { correct_order, .. }, Some(Ok(Answer::Sequence(s)))) => {
                grade_ordering(correct_order, &s, points)
            }
            (QuestionKind::Unsupported { type_name }, _) => {
                tracing::warn!(
                    "unknown question type '{}' for question '{}'",
                    type_name,
                    question.id
                );
                Outcome::incorrect("Unknown question type")
            }
            (_, Some(Err(e))) => {
                tracing::debug!("malformed answer for '{}': {}", question.id, e);
                Outcome::incorrect("Invalid answer format")
            }
            _ => Outcome::incorrect("Invalid answer format"),
        }
    }

    fn grade_short_answer(
        &self,
        key: &str,
        case_sensitive: bool,
        submitted: &str,
        points: f64,
    ) -> Outcome {
        let (student, expected) = if case_sensitive {
            (submitted.trim().to_string(), key.trim().to_string())
        } else {
            (submitted.trim().to_lowercase(), key.trim().to_lowercase())
        };

        if student == expected {
            return Outcome::correct(points, "Correct!");
        }

        let similarity = similarity(&student, &expected);
        if similarity >= self.policy.similarity_threshold {
            let awarded = (points * similarity).round();
            return Outcome {
                correct: false,
                points_earned: awarded,
                feedback: format!("Close answer. Awarded {awarded}/{points} points."),
                requires_manual_review: true,
            };
        }

        Outcome {
            correct: false,
            points_earned: 0.0,
            feedback: "Incorrect. Flagged for manual review.".into(),
            requires_manual_review: true,
        }
    }
}

/// Intermediate per-question score before it is attached to a question id.
#[derive(Debug, Clone, PartialEq)]
struct Outcome {
    correct: bool,
    points_earned: f64,
    feedback: String,
    requires_manual_review: bool,
}

impl Outcome {
    fn correct(points: f64, feedback: &str) -> Self {
        Self {
            correct: true,
            points_earned: points,
            feedback: feedback.into(),
            requires_manual_review: false,
        }
    }

    fn incorrect(feedback: impl Into<String>) -> Self {
        Self {
            correct: false,
            points_earned: 0.0,
            feedback: feedback.into(),
            requires_manual_review: false,
        }
    }

    fn unanswered() -> Self {
        Self::incorrect("No answer submitted")
    }
}

fn grade_multiple_choice(
    options: &[String],
    correct_answer: i64,
    chosen: Option<i64>,
    points: f64,
) -> Outcome {
    if chosen == Some(correct_answer) {
        return Outcome::correct(points, "Correct!");
    }

    let correct_text = usize::try_from(correct_answer)
        .ok()
        .and_then(|i| options.get(i));
    match correct_text {
        Some(text) => Outcome::incorrect(format!("Incorrect. Correct answer: {text}")),
        None => Outcome::incorrect(format!("Incorrect. Correct answer: option {correct_answer}")),
    }
}

/// Exact sorted-sequence equality; duplicates are kept, so `[0, 0, 2]` never
/// equals `[0, 2]`.
fn grade_checkbox(correct_answers: &[i64], selected: &[i64], points: f64) -> Outcome {
    let mut submitted = selected.to_vec();
    let mut expected = correct_answers.to_vec();
    submitted.sort_unstable();
    expected.sort_unstable();

    if submitted == expected {
        Outcome::correct(points, "Correct!")
    } else {
        Outcome::incorrect("Not all correct answers selected")
    }
}

fn grade_matching(
    pairs: &[MatchPair],
    submitted: &std::collections::BTreeMap<String, Value>,
    points: f64,
) -> Outcome {
    let total = pairs.len();
    let matched = pairs
        .iter()
        .filter(|p| submitted.get(&p.left).and_then(Value::as_str) == Some(p.right.as_str()))
        .count();

    let fraction = if total > 0 {
        matched as f64 / total as f64
    } else {
        0.0
    };
    let awarded = (points * fraction).round();

    if matched == total {
        Outcome {
            correct: true,
            points_earned: awarded,
            feedback: "All matches correct!".into(),
            requires_manual_review: false,
        }
    } else {
        Outcome {
            correct: false,
            points_earned: awarded,
            feedback: format!(
                "{matched}/{total} matches correct. Awarded {awarded}/{points} points."
            ),
            requires_manual_review: false,
        }
    }
}

/// Partial credit counts consecutive submitted items whose relative order
/// agrees with the correct order: a pair `(a, b)` counts when `b` comes
/// anywhere after `a` in the key. This is looser than requiring
/// `b` at the position right after `a`; under that stricter rule `[1, 3, 2]`
/// against `[1, 2, 3]` would earn nothing instead of one pair of two.
fn grade_ordering(correct_order: &[i64], submitted: &[i64], points: f64) -> Outcome {
    if submitted == correct_order {
        return Outcome::correct(points, "Correct order!");
    }

    let position = |item: &i64| correct_order.iter().position(|c| c == item);
    let correct_pairs = submitted
        .windows(2)
        .filter(|w| match (position(&w[0]), position(&w[1])) {
            (Some(a), Some(b)) => b > a,
            _ => false,
        })
        .count();

    let max_pairs = submitted.len().saturating_sub(1);
    let fraction = if max_pairs > 0 {
        correct_pairs as f64 / max_pairs as f64
    } else {
        0.0
    };
    let awarded = (points * fraction).round();

    Outcome {
        correct: false,
        points_earned: awarded,
        feedback: format!(
            "Partial credit: {correct_pairs}/{max_pairs} adjacent pairs correct. Awarded {awarded}/{points} points."
        ),
        requires_manual_review: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use serde_json::json;

    fn question(id: &str, points: f64, kind: QuestionKind) -> Question {
        Question {
            id: id.into(),
            prompt: String::new(),
            points,
            kind,
        }
    }

    fn worksheet(questions: Vec<Question>) -> Worksheet {
        Worksheet {
            id: "ws-1".into(),
            title: "Test".into(),
            description: String::new(),
            subject: None,
            grade_level: None,
            difficulty: Difficulty::Beginner,
            estimated_time: None,
            auto_grade: true,
            pass_score: None,
            questions,
        }
    }

    fn mc(id: &str, points: f64, correct: i64) -> Question {
        question(
            id,
            points,
            QuestionKind::MultipleChoice {
                options: vec!["Berlin".into(), "Paris".into(), "Rome".into()],
                correct_answer: correct,
            },
        )
    }

    fn checkbox(id: &str, points: f64, correct: Vec<i64>) -> Question {
        question(
            id,
            points,
            QuestionKind::Checkbox {
                options: vec![],
                correct_answers: correct,
            },
        )
    }

    fn short(id: &str, points: f64, key: &str, case_sensitive: bool) -> Question {
        question(
            id,
            points,
            QuestionKind::ShortAnswer {
                correct_answer: key.into(),
                case_sensitive,
            },
        )
    }

    fn matching(id: &str, points: f64, pairs: &[(&str, &str)]) -> Question {
        question(
            id,
            points,
            QuestionKind::Matching {
                pairs: pairs
                    .iter()
                    .map(|(l, r)| MatchPair {
                        left: (*l).into(),
                        right: (*r).into(),
                    })
                    .collect(),
            },
        )
    }

    fn ordering(id: &str, points: f64, order: Vec<i64>) -> Question {
        question(
            id,
            points,
            QuestionKind::Ordering {
                items: vec![],
                correct_order: order,
            },
        )
    }

    fn sample_worksheet() -> Worksheet {
        worksheet(vec![
            mc("q1", 2.0, 1),
            checkbox("q2", 3.0, vec![2, 0]),
            short("q3", 5.0, "paris", false),
            matching("q4", 3.0, &[("a", "1"), ("b", "2"), ("c", "3")]),
            ordering("q5", 4.0, vec![1, 2, 3]),
        ])
    }

    // --- multiple choice ---

    #[test]
    fn multiple_choice_exact_index() {
        let q = mc("q1", 2.0, 1);
        let fb = grade_question(&q, Some(&json!(1)));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 2.0);
        assert_eq!(fb.feedback, "Correct!");

        let fb = grade_question(&q, Some(&json!(0)));
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, 0.0);
        assert_eq!(fb.feedback, "Incorrect. Correct answer: Paris");
    }

    #[test]
    fn multiple_choice_does_not_coerce() {
        let q = mc("q1", 2.0, 1);
        for raw in [json!("1"), json!(1.5), json!([1]), json!(true)] {
            let fb = grade_question(&q, Some(&raw));
            assert_eq!(fb.points_earned, 0.0, "answer {raw} should score zero");
            assert_eq!(fb.correct, Some(false));
        }
    }

    #[test]
    fn whole_float_answers_match_integer_keys() {
        let fb = grade_question(&mc("q1", 2.0, 1), Some(&json!(1.0)));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 2.0);

        let fb = grade_question(&checkbox("q2", 3.0, vec![0, 2]), Some(&json!([2.0, 0.0])));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 3.0);

        let fb = grade_question(&ordering("q5", 4.0, vec![1, 2, 3]), Some(&json!([1.0, 2.0, 3.0])));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 4.0);
    }

    #[test]
    fn multiple_choice_key_without_option_text() {
        let q = question(
            "q1",
            1.0,
            QuestionKind::MultipleChoice {
                options: vec![],
                correct_answer: 3,
            },
        );
        let fb = grade_question(&q, Some(&json!(0)));
        assert_eq!(fb.feedback, "Incorrect. Correct answer: option 3");
    }

    // --- checkbox ---

    #[test]
    fn checkbox_is_order_independent() {
        let q = checkbox("q2", 3.0, vec![2, 0]);
        let fb = grade_question(&q, Some(&json!([0, 2])));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 3.0);
    }

    #[test]
    fn checkbox_subset_scores_zero() {
        let q = checkbox("q2", 3.0, vec![0, 2]);
        let fb = grade_question(&q, Some(&json!([0])));
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, 0.0);
        assert_eq!(fb.feedback, "Not all correct answers selected");
    }

    #[test]
    fn checkbox_duplicates_are_not_deduplicated() {
        let q = checkbox("q2", 3.0, vec![0, 2]);
        let fb = grade_question(&q, Some(&json!([0, 0, 2])));
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, 0.0);
    }

    #[test]
    fn checkbox_malformed_answer() {
        let q = checkbox("q2", 3.0, vec![0, 2]);
        let fb = grade_question(&q, Some(&json!("0,2")));
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, 0.0);
        assert_eq!(fb.feedback, "Invalid answer format");
    }

    // --- short answer ---

    #[test]
    fn short_answer_case_insensitive_exact() {
        let q = short("q3", 5.0, "paris", false);
        let fb = grade_question(&q, Some(&json!("  Paris ")));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 5.0);
        assert!(!fb.requires_manual_review);
    }

    #[test]
    fn short_answer_case_sensitive() {
        let q = short("q3", 5.0, "Paris", true);
        let fb = grade_question(&q, Some(&json!("paris")));
        // "paris" vs "Paris" differ by one char out of five: similarity 0.8
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, 4.0);
        assert!(fb.requires_manual_review);
    }

    #[test]
    fn short_answer_near_match_gets_partial_credit() {
        let q = short("q3", 5.0, "paris", false);
        let fb = grade_question(&q, Some(&json!("Pariss")));
        assert_eq!(fb.correct, Some(false));
        // similarity 5/6, round(5 * 0.8333) = 4
        assert_eq!(fb.points_earned, 4.0);
        assert!(fb.requires_manual_review);
        assert_eq!(fb.feedback, "Close answer. Awarded 4/5 points.");
    }

    #[test]
    fn short_answer_far_miss_flags_review() {
        let q = short("q3", 5.0, "paris", false);
        let fb = grade_question(&q, Some(&json!("london")));
        assert_eq!(fb.points_earned, 0.0);
        assert!(fb.requires_manual_review);
        assert_eq!(fb.feedback, "Incorrect. Flagged for manual review.");
    }

    #[test]
    fn short_answer_non_text_is_malformed_without_review() {
        let q = short("q3", 5.0, "paris", false);
        let fb = grade_question(&q, Some(&json!(42)));
        assert_eq!(fb.points_earned, 0.0);
        assert!(!fb.requires_manual_review);
        assert_eq!(fb.feedback, "Invalid answer format");
    }

    #[test]
    fn short_answer_threshold_follows_policy() {
        let strict = Grader::new(GradingPolicy {
            similarity_threshold: 0.9,
            ..GradingPolicy::default()
        });
        let q = short("q3", 5.0, "paris", false);
        let fb = strict.grade_question(&q, Some(&json!("pariss")));
        assert_eq!(fb.points_earned, 0.0);
        assert!(fb.requires_manual_review);
    }

    // --- matching ---

    #[test]
    fn matching_two_of_three() {
        let q = matching("q4", 3.0, &[("a", "1"), ("b", "2"), ("c", "3")]);
        let fb = grade_question(&q, Some(&json!({"a": "1", "b": "2", "c": "1"})));
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, (3.0_f64 * 2.0 / 3.0).round());
        assert_eq!(fb.feedback, "2/3 matches correct. Awarded 2/3 points.");
    }

    #[test]
    fn matching_all_correct() {
        let q = matching("q4", 3.0, &[("a", "1"), ("b", "2")]);
        let fb = grade_question(&q, Some(&json!({"b": "2", "a": "1"})));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 3.0);
        assert_eq!(fb.feedback, "All matches correct!");
    }

    #[test]
    fn matching_ignores_non_string_values() {
        let q = matching("q4", 2.0, &[("a", "1"), ("b", "2")]);
        let fb = grade_question(&q, Some(&json!({"a": 1, "b": "2"})));
        assert_eq!(fb.points_earned, 1.0);
        assert_eq!(fb.correct, Some(false));
    }

    #[test]
    fn matching_without_pairs_scores_zero() {
        let q = matching("q4", 3.0, &[]);
        let fb = grade_question(&q, Some(&json!({})));
        assert_eq!(fb.points_earned, 0.0);
    }

    #[test]
    fn matching_malformed_answer() {
        let q = matching("q4", 3.0, &[("a", "1")]);
        let fb = grade_question(&q, Some(&json!(["a", "1"])));
        assert_eq!(fb.feedback, "Invalid answer format");
        assert_eq!(fb.points_earned, 0.0);
    }

    // --- ordering ---

    #[test]
    fn ordering_exact() {
        let q = ordering("q5", 4.0, vec![1, 2, 3]);
        let fb = grade_question(&q, Some(&json!([1, 2, 3])));
        assert_eq!(fb.correct, Some(true));
        assert_eq!(fb.points_earned, 4.0);
        assert_eq!(fb.feedback, "Correct order!");
    }

    #[test]
    fn ordering_one_of_two_adjacent_pairs() {
        let q = ordering("q5", 4.0, vec![1, 2, 3]);
        let fb = grade_question(&q, Some(&json!([1, 3, 2])));
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, (4.0_f64 * 1.0 / 2.0).round());
        assert_eq!(
            fb.feedback,
            "Partial credit: 1/2 adjacent pairs correct. Awarded 2/4 points."
        );

        let fb = grade_question(&q, Some(&json!([2, 3, 1])));
        assert_eq!(fb.points_earned, 2.0);
    }

    #[test]
    fn ordering_counts_relative_order_not_adjacency() {
        let q = ordering("q5", 3.0, vec![1, 2, 3, 4]);
        let fb = grade_question(&q, Some(&json!([1, 3, 2, 4])));
        assert_eq!(fb.points_earned, 2.0);
        assert_eq!(
            fb.feedback,
            "Partial credit: 2/3 adjacent pairs correct. Awarded 2/3 points."
        );
    }

    #[test]
    fn ordering_reversed_scores_zero() {
        let q = ordering("q5", 4.0, vec![1, 2, 3]);
        let fb = grade_question(&q, Some(&json!([3, 2, 1])));
        assert_eq!(fb.points_earned, 0.0);
        assert_eq!(fb.correct, Some(false));
    }

    #[test]
    fn ordering_unknown_items_never_count() {
        let q = ordering("q5", 4.0, vec![1, 2, 3]);
        let fb = grade_question(&q, Some(&json!([1, 9, 2])));
        assert_eq!(fb.points_earned, 0.0);
    }

    #[test]
    fn ordering_short_answer_scores_zero() {
        let q = ordering("q5", 4.0, vec![1, 2, 3]);
        let fb = grade_question(&q, Some(&json!([1])));
        assert_eq!(fb.points_earned, 0.0);
        let fb = grade_question(&q, Some(&json!([])));
        assert_eq!(fb.points_earned, 0.0);
    }

    #[test]
    fn ordering_malformed_answer() {
        let q = ordering("q5", 4.0, vec![1, 2, 3]);
        let fb = grade_question(&q, Some(&json!({"0": 1})));
        assert_eq!(fb.feedback, "Invalid answer format");
    }

    // --- unanswered and unsupported ---

    #[test]
    fn unanswered_question() {
        let q = checkbox("q2", 3.0, vec![0]);
        let fb = grade_question(&q, None);
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, 0.0);
        assert_eq!(fb.feedback, "No answer submitted");
    }

    #[test]
    fn unsupported_type_degrades_gracefully() {
        let q = question(
            "doc",
            2.0,
            QuestionKind::Unsupported {
                type_name: "essay".into(),
            },
        );
        let fb = grade_question(&q, Some(&json!("anything")));
        assert_eq!(fb.correct, Some(false));
        assert_eq!(fb.points_earned, 0.0);
        assert_eq!(fb.feedback, "Unknown question type");
        assert_eq!(fb.max_points, 2.0);

        let fb = grade_question(&q, None);
        assert_eq!(fb.feedback, "Unknown question type");
    }

    #[test]
    fn fractional_points_never_exceed_max() {
        let q = matching("q4", 0.6, &[("a", "1")]);
        let fb = grade_question(&q, Some(&json!({"a": "1"})));
        assert_eq!(fb.points_earned, 0.6);
    }

    // --- aggregate ---

    #[test]
    fn submission_totals() {
        let ws = sample_worksheet();
        let answers = json!({
            "q1": 1,
            "q2": [0, 2],
            "q3": "Pariss",
            "q4": {"a": "1", "b": "2", "c": "1"},
            "q5": [2, 3, 1],
        });
        let result = grade_submission(&ws, &answers).unwrap();

        assert_eq!(result.feedback.len(), 5);
        let ids: Vec<&str> = result.feedback.iter().map(|f| f.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3", "q4", "q5"]);

        assert_eq!(result.max_score, 17.0);
        // 2 + 3 + 4 + 2 + 2
        assert_eq!(result.score, 13.0);
        let sum: f64 = result.feedback.iter().map(|f| f.points_earned).sum();
        assert_eq!(result.score, sum);
        assert_eq!(result.percentage, (13.0_f64 / 17.0 * 100.0).round() as u32);
        assert!(result.passed);
        assert!(result.needs_manual_review());
    }

    #[test]
    fn submission_rejects_non_mapping_answers() {
        let ws = sample_worksheet();
        let err = grade_submission(&ws, &json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, GradingError::InvalidInput(_)));
        assert!(grade_submission(&ws, &json!("answers")).is_err());
    }

    #[test]
    fn malformed_answer_does_not_stop_grading() {
        let ws = sample_worksheet();
        let answers = json!({"q2": "not a list", "q5": [1, 2, 3]});
        let result = grade_submission(&ws, &answers).unwrap();
        assert_eq!(result.feedback.len(), 5);
        assert_eq!(result.feedback[1].feedback, "Invalid answer format");
        assert_eq!(result.feedback[4].points_earned, 4.0);
    }

    #[test]
    fn empty_worksheet_has_zero_percentage() {
        let ws = worksheet(vec![]);
        let result = grade_submission(&ws, &json!({})).unwrap();
        assert_eq!(result.max_score, 0.0);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
        assert!(result.feedback.is_empty());
    }

    #[test]
    fn pass_score_defaults_to_seventy() {
        let ws = worksheet(vec![mc("q1", 7.0, 0), mc("q2", 3.0, 0)]);
        let result = grade_submission(&ws, &json!({"q1": 0})).unwrap();
        assert_eq!(result.percentage, 70);
        assert!(result.passed);

        let mut strict = ws.clone();
        strict.pass_score = Some(80);
        let result = grade_submission(&strict, &json!({"q1": 0})).unwrap();
        assert!(!result.passed);

        let mut lenient = ws;
        lenient.pass_score = Some(0);
        let result = grade_submission(&lenient, &json!({})).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn grading_is_idempotent() {
        let ws = sample_worksheet();
        let answers = json!({"q1": 2, "q3": "pari", "q4": {"a": "1"}, "q5": [3, 1, 2]});
        let first = serde_json::to_string(&grade_submission(&ws, &answers).unwrap()).unwrap();
        let second = serde_json::to_string(&grade_submission(&ws, &answers).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn points_stay_within_bounds() {
        let ws = sample_worksheet();
        let answers = json!({
            "q1": 1, "q2": [2, 0], "q3": "paris",
            "q4": {"a": "1", "b": "2", "c": "3"}, "q5": [1, 2, 3]
        });
        let result = grade_submission(&ws, &answers).unwrap();
        for (fb, q) in result.feedback.iter().zip(&ws.questions) {
            assert!(fb.points_earned >= 0.0 && fb.points_earned <= q.points);
        }
        assert_eq!(result.score, result.max_score);
        assert_eq!(result.percentage, 100);
    }

    #[test]
    fn manual_review_extraction() {
        let ws = sample_worksheet();
        let result = grade_submission(&ws, &json!({"q3": "lyon"})).unwrap();
        let review = questions_for_manual_review(&result.feedback);
        assert_eq!(review.len(), 1);
        assert_eq!(review[0].question_id, "q3");
    }

    #[test]
    fn result_serializes_camel_case() {
        let ws = worksheet(vec![mc("q1", 1.0, 0)]);
        let result = grade_submission(&ws, &json!({"q1": 0})).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["maxScore"], json!(1.0));
        assert_eq!(value["feedback"][0]["questionId"], json!("q1"));
        assert_eq!(value["feedback"][0]["requiresManualReview"], json!(false));
    }
}
