//! The `autograde batch` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use autograde_core::config::load_config_from;
use autograde_core::engine::{
    load_submission_directory, BatchGrader, BatchGraderConfig, ProgressReporter,
};
use autograde_core::parser;
use autograde_core::report::{GradeReport, GradedSubmission};
use autograde_report::html::write_html_report;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_submission_graded(&self, submission: &GradedSubmission) {
        match &submission.result {
            Some(r) => eprintln!(
                "  Graded: {} {}% [{}]",
                submission.submission_id, r.percentage, submission.status
            ),
            None => eprintln!(
                "  Recorded: {} [{}]",
                submission.submission_id, submission.status
            ),
        }
    }

    fn on_submission_error(&self, submission_id: &str, error: &str) {
        eprintln!("  ERROR: {submission_id}: {error}");
    }

    fn on_batch_complete(&self, total: usize, graded: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {graded}/{total} graded, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    worksheet_path: PathBuf,
    submissions_dir: PathBuf,
    parallelism: Option<usize>,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut grader_config = BatchGraderConfig::from(&config);
    if let Some(p) = parallelism {
        anyhow::ensure!(p >= 1, "parallelism must be at least 1");
        grader_config.parallelism = p;
    }
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let worksheet = parser::parse_worksheet(&worksheet_path)?;
    let submissions = load_submission_directory(&submissions_dir)?;
    anyhow::ensure!(
        !submissions.is_empty(),
        "no submissions found in {}",
        submissions_dir.display()
    );

    eprintln!(
        "autograde v{}: grading {} submissions for '{}'",
        env!("CARGO_PKG_VERSION"),
        submissions.len(),
        worksheet.title
    );
    eprintln!();

    let report = BatchGrader::new(grader_config)
        .grade_all(&worksheet, submissions, &ConsoleReporter)
        .await?;

    print_summary(&report);

    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");

    let formats: Vec<&str> = if format == "all" {
        vec!["json", "html"]
    } else {
        format.split(',').collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = output.join(format!("report-{timestamp}.json"));
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("report-{timestamp}.html"));
                write_html_report(&report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            _ => {
                tracing::warn!("unknown format: {fmt}");
            }
        }
    }

    Ok(())
}

fn print_summary(report: &GradeReport) {
    let mut table = Table::new();
    table.set_header(vec!["Submission", "Student", "Score", "Percentage", "Status"]);

    for s in &report.submissions {
        let (score, percentage) = match &s.result {
            Some(r) => (
                format!("{}/{}", r.score, r.max_score),
                format!("{}%", r.percentage),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![
            Cell::new(&s.submission_id),
            Cell::new(s.student.as_deref().unwrap_or("-")),
            Cell::new(score),
            Cell::new(percentage),
            Cell::new(s.status),
        ]);
    }

    eprintln!("\n{table}");

    let stats = &report.stats;
    if stats.submissions > 0 {
        eprintln!(
            "Mean {:.1}% | median {:.1}% | pass rate {:.1}% | {} awaiting review",
            stats.mean_percentage,
            stats.median_percentage,
            stats.pass_rate * 100.0,
            stats.needs_review
        );
    }
}
