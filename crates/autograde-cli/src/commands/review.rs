//! The `autograde review` command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use autograde_core::grading::questions_for_manual_review;
use autograde_core::report::GradeReport;
use autograde_core::review::{ReviewOverride, SubmissionStatus};

pub fn execute(report_path: PathBuf, apply: Option<PathBuf>) -> Result<()> {
    let mut report = GradeReport::load_json(&report_path)?;

    match apply {
        Some(overrides_path) => {
            let content = std::fs::read_to_string(&overrides_path).with_context(|| {
                format!("failed to read overrides: {}", overrides_path.display())
            })?;
            let overrides: HashMap<String, Vec<ReviewOverride>> = serde_json::from_str(&content)
                .with_context(|| {
                    format!("failed to parse overrides: {}", overrides_path.display())
                })?;

            let updated = report.apply_reviews(&overrides)?;
            report.save_json(&report_path)?;

            println!("Applied reviews to {updated} submission(s).");
            print_pending(&report);
        }
        None => print_pending(&report),
    }

    Ok(())
}

fn print_pending(report: &GradeReport) {
    let mut table = Table::new();
    table.set_header(vec!["Submission", "Student", "Question", "Points", "Feedback"]);
    let mut pending = 0usize;

    for s in &report.submissions {
        if s.status != SubmissionStatus::NeedsReview {
            continue;
        }
        let Some(result) = &s.result else { continue };
        for f in questions_for_manual_review(&result.feedback) {
            table.add_row(vec![
                Cell::new(&s.submission_id),
                Cell::new(s.student.as_deref().unwrap_or("-")),
                Cell::new(&f.question_id),
                Cell::new(format!("{}/{}", f.points_earned, f.max_points)),
                Cell::new(&f.feedback),
            ]);
            pending += 1;
        }
    }

    if pending == 0 {
        println!("No submissions need review.");
    } else {
        println!("{table}");
        println!("{pending} answer(s) awaiting review.");
    }
}
