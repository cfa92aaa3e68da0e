//! Batch grading orchestrator.
//!
//! Grades many submissions to one worksheet concurrently and collects them
//! into a [`GradeReport`].

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::AutogradeConfig;
use crate::grading::{Grader, GradingPolicy};
use crate::model::Worksheet;
use crate::report::{BatchFailure, GradeReport, GradedSubmission, WorksheetSummary};
use crate::review::SubmissionStatus;
use crate::statistics::compute_aggregate_stats;

/// One student's answers to a worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    #[serde(default)]
    pub student: Option<String>,
    /// Answers keyed by question id. Must be a JSON object to be graded.
    pub answers: Value,
}

#[derive(Deserialize)]
struct SubmissionFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    student: Option<String>,
    answers: Value,
}

impl Submission {
    /// Load a submission from a JSON file.
    ///
    /// The file is either `{ "id"?, "student"?, "answers": {...} }` or a bare
    /// answer object. Any other key next to `answers` makes it a bare answer
    /// object, so a question may be named `answers`. The id defaults to the
    /// file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read submission: {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse submission: {}", path.display()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let wrapped = value.as_object().is_some_and(|map| {
            map.contains_key("answers")
                && map
                    .keys()
                    .all(|k| matches!(k.as_str(), "id" | "student" | "answers"))
        });
        if wrapped {
            let file: SubmissionFile = serde_json::from_value(value)
                .with_context(|| format!("invalid submission: {}", path.display()))?;
            Ok(Submission {
                id: file.id.unwrap_or(stem),
                student: file.student,
                answers: file.answers,
            })
        } else {
            Ok(Submission {
                id: stem,
                student: None,
                answers: value,
            })
        }
    }
}

/// Load every `.json` submission in a directory, sorted by file name.
pub fn load_submission_directory(dir: &Path) -> Result<Vec<Submission>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut submissions = Vec::with_capacity(paths.len());
    for path in paths {
        match Submission::load(&path) {
            Ok(s) => submissions.push(s),
            Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
        }
    }
    Ok(submissions)
}

/// Configuration for the batch grader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchGraderConfig {
    /// Maximum submissions graded at once.
    pub parallelism: usize,
    pub policy: GradingPolicy,
}

impl Default for BatchGraderConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            policy: GradingPolicy::default(),
        }
    }
}

impl From<&AutogradeConfig> for BatchGraderConfig {
    fn from(config: &AutogradeConfig) -> Self {
        Self {
            parallelism: config.parallelism,
            policy: config.policy(),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_submission_graded(&self, submission: &GradedSubmission);
    fn on_submission_error(&self, submission_id: &str, error: &str);
    fn on_batch_complete(&self, total: usize, graded: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_submission_graded(&self, _: &GradedSubmission) {}
    fn on_submission_error(&self, _: &str, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// Grades submissions concurrently.
pub struct BatchGrader {
    config: BatchGraderConfig,
}

impl BatchGrader {
    pub fn new(config: BatchGraderConfig) -> Self {
        Self { config }
    }

    /// Grade every submission and assemble a report.
    ///
    /// Submissions keep their input order in the report. A submission whose
    /// answers are not an object is recorded as a failure and the rest of the
    /// batch continues.
    pub async fn grade_all(
        &self,
        worksheet: &Worksheet,
        submissions: Vec<Submission>,
        progress: &dyn ProgressReporter,
    ) -> Result<GradeReport> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let grader = Grader::new(self.config.policy);
        let pass_score = grader.pass_score(worksheet);
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let worksheet_arc = Arc::new(worksheet.clone());

        let mut futures = FuturesUnordered::new();

        for (index, submission) in submissions.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let worksheet = Arc::clone(&worksheet_arc);

            futures.push(async move {
                let submission_id = submission.id.clone();
                let inner = async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;

                    if !worksheet.auto_grade {
                        return Ok(GradedSubmission {
                            submission_id: submission.id,
                            student: submission.student,
                            status: SubmissionStatus::Pending,
                            result: None,
                            graded_at: None,
                        });
                    }

                    let result = tokio::task::spawn_blocking(move || {
                        grader
                            .grade_submission(&worksheet, &submission.answers)
                            .map(|result| (submission, result))
                    })
                    .await
                    .context("grading task panicked")?;

                    let (submission, result) = result?;
                    Ok::<_, anyhow::Error>(GradedSubmission {
                        submission_id: submission.id,
                        student: submission.student,
                        status: SubmissionStatus::for_result(&result),
                        result: Some(result),
                        graded_at: Some(Utc::now()),
                    })
                };
                (index, submission_id, inner.await)
            });
        }

        let total = futures.len();
        let mut graded = Vec::new();
        let mut failures = Vec::new();

        while let Some((index, submission_id, outcome)) = futures.next().await {
            match outcome {
                Ok(submission) => {
                    progress.on_submission_graded(&submission);
                    graded.push((index, submission));
                }
                Err(e) => {
                    tracing::error!("grading failed for {submission_id}: {e:#}");
                    progress.on_submission_error(&submission_id, &e.to_string());
                    failures.push((
                        index,
                        BatchFailure {
                            submission_id,
                            error: format!("{e:#}"),
                        },
                    ));
                }
            }
        }

        graded.sort_by_key(|(index, _)| *index);
        failures.sort_by_key(|(index, _)| *index);
        let submissions: Vec<GradedSubmission> = graded.into_iter().map(|(_, s)| s).collect();
        let failures: Vec<BatchFailure> = failures.into_iter().map(|(_, f)| f).collect();

        let elapsed = start.elapsed();
        progress.on_batch_complete(total, submissions.len(), failures.len(), elapsed);

        let results: Vec<_> = submissions.iter().filter_map(|s| s.result.as_ref()).collect();
        let stats = compute_aggregate_stats(&results);

        tracing::info!(
            worksheet = %worksheet.id,
            graded = submissions.len(),
            failed = failures.len(),
            "batch complete"
        );

        Ok(GradeReport {
            id: run_id,
            created_at: Utc::now(),
            worksheet: WorksheetSummary::new(worksheet, pass_score),
            submissions,
            failures,
            stats,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}
