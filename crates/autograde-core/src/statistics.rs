//! Aggregate statistics over the graded submissions of one worksheet.
//!
//! Per-question rates help authors spot questions that are too hard, too
//! easy, or too often sent to manual review.

use serde::{Deserialize, Serialize};

use crate::grading::GradingResult;

/// Statistics for a set of submissions to one worksheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Number of graded submissions.
    pub submissions: usize,
    /// Mean percentage.
    pub mean_percentage: f64,
    /// Median percentage.
    pub median_percentage: f64,
    /// Lowest percentage.
    pub min_percentage: u32,
    /// Highest percentage.
    pub max_percentage: u32,
    /// Fraction of submissions that passed.
    pub pass_rate: f64,
    /// Submissions with at least one answer awaiting review.
    pub needs_review: usize,
    /// Per-question statistics, in authored order.
    pub per_question: Vec<QuestionStats>,
}

/// Statistics for a single question across submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: String,
    pub max_points: f64,
    /// Mean points earned.
    pub avg_points: f64,
    /// Fraction of submissions marked correct.
    pub correct_rate: f64,
    /// Fraction of submissions flagged for manual review.
    pub review_rate: f64,
}

/// Median of a sorted, non-empty slice.
fn median(sorted: &[u32]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// Compute aggregate statistics from grading results.
///
/// Question order is taken from the first result; every result is expected to
/// come from the same worksheet.
pub fn compute_aggregate_stats(results: &[&GradingResult]) -> AggregateStats {
    let Some(first) = results.first() else {
        return AggregateStats::default();
    };
    let n = results.len() as f64;

    let mut percentages: Vec<u32> = results.iter().map(|r| r.percentage).collect();
    percentages.sort_unstable();

    let per_question = first
        .feedback
        .iter()
        .map(|template| {
            let entries: Vec<_> = results
                .iter()
                .filter_map(|r| {
                    r.feedback
                        .iter()
                        .find(|f| f.question_id == template.question_id)
                })
                .collect();
            let count = entries.len().max(1) as f64;

            QuestionStats {
                question_id: template.question_id.clone(),
                max_points: template.max_points,
                avg_points: entries.iter().map(|f| f.points_earned).sum::<f64>() / count,
                correct_rate: entries.iter().filter(|f| f.correct == Some(true)).count() as f64
                    / count,
                review_rate: entries.iter().filter(|f| f.requires_manual_review).count() as f64
                    / count,
            }
        })
        .collect();

    AggregateStats {
        submissions: results.len(),
        mean_percentage: percentages.iter().map(|&p| p as f64).sum::<f64>() / n,
        median_percentage: median(&percentages),
        min_percentage: percentages[0],
        max_percentage: percentages[percentages.len() - 1],
        pass_rate: results.iter().filter(|r| r.passed).count() as f64 / n,
        needs_review: results.iter().filter(|r| r.needs_manual_review()).count(),
        per_question,
    }
}
