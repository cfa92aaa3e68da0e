//! The `autograde grade` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use autograde_core::config::load_config_from;
use autograde_core::engine::Submission;
use autograde_core::grading::{Grader, GradingResult};
use autograde_core::parser;

pub fn execute(
    worksheet_path: PathBuf,
    answers_path: PathBuf,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let worksheet = parser::parse_worksheet(&worksheet_path)?;
    let submission = Submission::load(&answers_path)?;

    let grader = Grader::new(config.policy());
    let result = grader.grade_submission(&worksheet, &submission.answers)?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Worksheet: {}", worksheet.title);
            print_feedback(&result);
        }
    }

    Ok(())
}

fn print_feedback(result: &GradingResult) {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Result", "Points", "Feedback"]);

    for f in &result.feedback {
        let outcome = match (f.correct, f.requires_manual_review) {
            (_, true) => "REVIEW",
            (Some(true), _) => "OK",
            (Some(false), _) => "WRONG",
            (None, _) => "-",
        };
        table.add_row(vec![
            Cell::new(&f.question_id),
            Cell::new(outcome),
            Cell::new(format!("{}/{}", f.points_earned, f.max_points)),
            Cell::new(&f.feedback),
        ]);
    }

    println!("{table}");
    println!(
        "Score: {}/{} ({}%) {}",
        result.score,
        result.max_score,
        result.percentage,
        if result.passed { "PASSED" } else { "FAILED" }
    );

    let pending = result
        .feedback
        .iter()
        .filter(|f| f.requires_manual_review)
        .count();
    if pending > 0 {
        println!("{pending} question(s) need manual review.");
    }
}
