//! autograde-report - Report generation for grading runs.
//!
//! Renders a [`GradeReport`](autograde_core::report::GradeReport) as a
//! self-contained HTML page.

pub mod html;
