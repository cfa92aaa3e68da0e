//! Batch grade reports with JSON persistence and regrade comparison.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::GradingResult;
use crate::model::Worksheet;
use crate::review::{apply_review, ReviewOverride, SubmissionStatus};
use crate::statistics::{compute_aggregate_stats, AggregateStats};

/// A complete grading run over many submissions to one worksheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the worksheet.
    pub worksheet: WorksheetSummary,
    /// Graded submissions, in input order.
    pub submissions: Vec<GradedSubmission>,
    /// Submissions that could not be graded.
    #[serde(default)]
    pub failures: Vec<BatchFailure>,
    /// Aggregate statistics over graded submissions.
    pub stats: AggregateStats,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of a worksheet (without the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetSummary {
    pub id: String,
    pub title: String,
    pub question_count: usize,
    pub max_score: f64,
    pub pass_score: u32,
}

impl WorksheetSummary {
    pub fn new(worksheet: &Worksheet, pass_score: u32) -> Self {
        Self {
            id: worksheet.id.clone(),
            title: worksheet.title.clone(),
            question_count: worksheet.questions.len(),
            max_score: worksheet.max_score(),
            pass_score,
        }
    }
}

/// One student's graded submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedSubmission {
    pub submission_id: String,
    #[serde(default)]
    pub student: Option<String>,
    pub status: SubmissionStatus,
    /// `None` while the submission is pending.
    #[serde(default)]
    pub result: Option<GradingResult>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
}

/// A submission that could not be graded at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub submission_id: String,
    pub error: String,
}

impl GradeReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: GradeReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Results of all submissions that have been graded.
    pub fn results(&self) -> Vec<&GradingResult> {
        self.submissions
            .iter()
            .filter_map(|s| s.result.as_ref())
            .collect()
    }

    /// Recompute aggregate statistics from the current submissions.
    pub fn refresh_stats(&mut self) {
        self.stats = compute_aggregate_stats(&self.results());
    }

    /// Apply reviewer overrides keyed by submission id.
    ///
    /// Reviewed submissions move to [`SubmissionStatus::Reviewed`] and the
    /// aggregate statistics are recomputed. Returns the number of submissions
    /// updated. If any override is rejected the report is left unchanged.
    pub fn apply_reviews(
        &mut self,
        overrides: &HashMap<String, Vec<ReviewOverride>>,
    ) -> Result<usize> {
        let pass_score = self.worksheet.pass_score;

        // Every override is checked before any submission changes.
        let mut reviewed = Vec::with_capacity(overrides.len());
        for (submission_id, items) in overrides {
            let index = self
                .submissions
                .iter()
                .position(|s| &s.submission_id == submission_id)
                .with_context(|| format!("unknown submission: {submission_id}"))?;
            let result = self.submissions[index]
                .result
                .as_ref()
                .with_context(|| format!("submission {submission_id} has not been graded"))?;

            let result = apply_review(result, items, pass_score)
                .with_context(|| format!("failed to review submission {submission_id}"))?;
            reviewed.push((index, result));
        }

        let updated = reviewed.len();
        let now = Utc::now();
        for (index, result) in reviewed {
            let submission = &mut self.submissions[index];
            submission.status = if result.needs_manual_review() {
                SubmissionStatus::NeedsReview
            } else {
                SubmissionStatus::Reviewed
            };
            submission.result = Some(result);
            submission.graded_at = Some(now);
        }

        self.refresh_stats();
        Ok(updated)
    }

    /// Compare this report against a baseline grading of the same submissions.
    ///
    /// `threshold` is in percentage points; smaller changes count as unchanged.
    pub fn compare(&self, baseline: &GradeReport, threshold: f64) -> RegradeReport {
        let percentage_map = |report: &GradeReport| -> HashMap<String, (Option<String>, u32)> {
            report
                .submissions
                .iter()
                .filter_map(|s| {
                    s.result
                        .as_ref()
                        .map(|r| (s.submission_id.clone(), (s.student.clone(), r.percentage)))
                })
                .collect()
        };

        let baseline_scores = percentage_map(baseline);
        let current_scores = percentage_map(self);

        let mut regressions = Vec::new();
        let mut improvements = Vec::new();
        let mut unchanged = 0usize;
        let mut new_submissions = 0usize;

        for (id, (student, current)) in &current_scores {
            if let Some((_, baseline_val)) = baseline_scores.get(id) {
                let delta = *current as i64 - *baseline_val as i64;
                let change = ScoreChange {
                    submission_id: id.clone(),
                    student: student.clone(),
                    baseline_percentage: *baseline_val,
                    current_percentage: *current,
                    delta,
                };
                if (delta as f64) < -threshold {
                    regressions.push(change);
                } else if (delta as f64) > threshold {
                    improvements.push(change);
                } else {
                    unchanged += 1;
                }
            } else {
                new_submissions += 1;
            }
        }

        let removed_submissions = baseline_scores
            .keys()
            .filter(|k| !current_scores.contains_key(*k))
            .count();

        regressions.sort_by(|a, b| a.submission_id.cmp(&b.submission_id));
        improvements.sort_by(|a, b| a.submission_id.cmp(&b.submission_id));

        RegradeReport {
            regressions,
            improvements,
            unchanged,
            new_submissions,
            removed_submissions,
        }
    }
}

/// Result of comparing two grade reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegradeReport {
    /// Submissions whose percentage went down.
    pub regressions: Vec<ScoreChange>,
    /// Submissions whose percentage went up.
    pub improvements: Vec<ScoreChange>,
    /// Submissions with no significant change.
    pub unchanged: usize,
    /// Submissions graded in current but not in baseline.
    pub new_submissions: usize,
    /// Submissions graded in baseline but not in current.
    pub removed_submissions: usize,
}

/// A percentage change for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreChange {
    pub submission_id: String,
    pub student: Option<String>,
    pub baseline_percentage: u32,
    pub current_percentage: u32,
    pub delta: i64,
}

impl RegradeReport {
    /// Format the regrade report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} regressions, {} improvements, {} unchanged\n\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));

        let mut section = |title: &str, changes: &[ScoreChange]| {
            if changes.is_empty() {
                return;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Submission | Student | Baseline | Current | Delta |\n");
            md.push_str("|------------|---------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {} | {}% | {}% | {:+}% |\n",
                    c.submission_id,
                    c.student.as_deref().unwrap_or("-"),
                    c.baseline_percentage,
                    c.current_percentage,
                    c.delta
                ));
            }
            md.push('\n');
        };

        section("Regressions", &self.regressions);
        section("Improvements", &self.improvements);

        md
    }

    /// Returns true if any submission lost points.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}
