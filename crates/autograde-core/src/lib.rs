//! autograde-core - Worksheet grading engine, data model, and reports.
//!
//! This crate defines the worksheet model, the per-question grading rules,
//! and the batch, review, and reporting layers built on top of them.

pub mod config;
pub mod engine;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod report;
pub mod review;
pub mod similarity;
pub mod statistics;

pub use error::GradingError;
pub use grading::{
    grade_question, grade_submission, Grader, GradingPolicy, GradingResult, QuestionFeedback,
};
pub use model::{Answer, AnswerSet, Question, QuestionKind, Worksheet};
