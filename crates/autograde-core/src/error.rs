//! Grading error types.
//!
//! These represent contract violations by the caller. Problems with a single
//! student answer are never errors: they are scored as zero with feedback.

use thiserror::Error;

/// Errors raised before or instead of producing a grading result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradingError {
    /// The worksheet or the answer set is not well-formed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A review override names a question that is not part of the result.
    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    /// A review override awards points outside `[0, max]`.
    #[error("points {points} out of range for question {question_id} (max {max})")]
    PointsOutOfRange {
        question_id: String,
        points: f64,
        max: f64,
    },
}

impl GradingError {
    /// Returns `true` if the error was caused by malformed input documents.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, GradingError::InvalidInput(_))
    }
}
