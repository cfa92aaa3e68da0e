//! Core data model types for autograde.
//!
//! A [`Worksheet`] is an ordered list of authored [`Question`]s. Each question
//! carries its answer key inside a [`QuestionKind`] variant, and each student
//! answer is coerced into the matching [`Answer`] variant before scoring.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::GradingError;

/// An authored worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    /// Unique identifier for this worksheet.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Description shown to students.
    pub description: String,
    /// Subject area (e.g. "geography").
    pub subject: Option<String>,
    /// Target grade level.
    pub grade_level: Option<String>,
    /// Authored difficulty.
    pub difficulty: Difficulty,
    /// Estimated completion time in minutes.
    pub estimated_time: Option<u32>,
    /// Whether submissions are scored automatically.
    pub auto_grade: bool,
    /// Minimum percentage needed to pass. `None` falls back to the policy default.
    pub pass_score: Option<u32>,
    /// The questions, in authored order.
    pub questions: Vec<Question>,
}

impl Worksheet {
    /// Sum of authored points across all questions.
    pub fn max_score(&self) -> f64 {
        self.questions.iter().map(|q| q.points).sum()
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Authored difficulty of a worksheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A single authored question.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// Identifier, unique within the worksheet.
    pub id: String,
    /// Prompt text shown to the student.
    pub prompt: String,
    /// Maximum score for this question.
    pub points: f64,
    /// Question type together with its answer key.
    pub kind: QuestionKind,
}

/// The question type and its answer key.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// One option out of several; the answer is the option index.
    MultipleChoice {
        options: Vec<String>,
        correct_answer: i64,
    },
    /// Any subset of options; the answer is the list of selected indices.
    Checkbox {
        options: Vec<String>,
        correct_answers: Vec<i64>,
    },
    /// Free text compared against a reference answer.
    ShortAnswer {
        correct_answer: String,
        case_sensitive: bool,
    },
    /// Left items matched to right items.
    Matching { pairs: Vec<MatchPair> },
    /// Items arranged into a sequence of indices.
    Ordering {
        items: Vec<String>,
        correct_order: Vec<i64>,
    },
    /// A type this engine does not grade, such as an embedded document.
    Unsupported { type_name: String },
}

impl QuestionKind {
    /// The wire tag of this question type.
    pub fn type_name(&self) -> &str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple-choice",
            QuestionKind::Checkbox { .. } => "checkbox",
            QuestionKind::ShortAnswer { .. } => "short-answer",
            QuestionKind::Matching { .. } => "matching",
            QuestionKind::Ordering { .. } => "ordering",
            QuestionKind::Unsupported { type_name } => type_name.as_str(),
        }
    }

    /// Returns `true` for every type the engine knows how to score.
    pub fn is_gradable(&self) -> bool {
        !matches!(self, QuestionKind::Unsupported { .. })
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One authored pair of a matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

/// A student answer, typed by the question kind it answers.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Selected option index of a multiple-choice question.
    Choice(i64),
    /// Selected option indices of a checkbox question.
    Selection(Vec<i64>),
    /// Free text of a short-answer question.
    Text(String),
    /// Left item to submitted right item of a matching question.
    Matches(BTreeMap<String, Value>),
    /// Proposed order of an ordering question.
    Sequence(Vec<i64>),
}

/// A raw value whose shape does not fit the question it answers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}")]
pub struct MalformedAnswer {
    pub expected: &'static str,
}

impl Answer {
    /// Interpret a raw submitted value as the answer to a question of `kind`.
    pub fn coerce(kind: &QuestionKind, raw: &Value) -> Result<Answer, MalformedAnswer> {
        match kind {
            QuestionKind::MultipleChoice { .. } => index_value(raw)
                .map(Answer::Choice)
                .ok_or(MalformedAnswer {
                    expected: "an option index",
                }),
            QuestionKind::Checkbox { .. } => index_list(raw)
                .map(Answer::Selection)
                .ok_or(MalformedAnswer {
                    expected: "a list of option indices",
                }),
            QuestionKind::ShortAnswer { .. } => raw
                .as_str()
                .map(|s| Answer::Text(s.to_string()))
                .ok_or(MalformedAnswer { expected: "text" }),
            QuestionKind::Matching { .. } => raw
                .as_object()
                .map(|map| {
                    Answer::Matches(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                })
                .ok_or(MalformedAnswer {
                    expected: "a mapping of left items to right items",
                }),
            QuestionKind::Ordering { .. } => index_list(raw)
                .map(Answer::Sequence)
                .ok_or(MalformedAnswer {
                    expected: "a list of item indices",
                }),
            QuestionKind::Unsupported { .. } => Err(MalformedAnswer {
                expected: "nothing, the question is not gradable",
            }),
        }
    }
}

/// A float with no fractional part as an index, so `1.0` and `1` are the same number.
pub(crate) fn whole_number(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn index_value(raw: &Value) -> Option<i64> {
    raw.as_i64().or_else(|| raw.as_f64().and_then(whole_number))
}

fn index_list(raw: &Value) -> Option<Vec<i64>> {
    raw.as_array()?.iter().map(index_value).collect()
}

/// A student's answers to one worksheet, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet(BTreeMap<String, Value>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw answer for a question.
    pub fn insert(&mut self, question_id: impl Into<String>, value: Value) {
        self.0.insert(question_id.into(), value);
    }

    /// The raw answer for a question. JSON `null` counts as unanswered.
    pub fn get(&self, question_id: &str) -> Option<&Value> {
        self.0.get(question_id).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&Value> for AnswerSet {
    type Error = GradingError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value.as_object() {
            Some(map) => Ok(AnswerSet(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            None => Err(GradingError::InvalidInput(
                "answers must be a mapping of question id to value".into(),
            )),
        }
    }
}

impl TryFrom<Value> for AnswerSet {
    type Error = GradingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        AnswerSet::try_from(&value)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        AnswerSet(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
