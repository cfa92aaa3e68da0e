//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::Result;
use std::path::Path;

use autograde_core::report::{GradeReport, GradedSubmission};
use autograde_core::review::SubmissionStatus;
use autograde_core::statistics::QuestionStats;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML report from a grade report.
pub fn generate_html(report: &GradeReport) -> String {
    let mut html = String::new();
    let stats = &report.stats;

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>autograde report: {}</title>\n",
        html_escape(&report.worksheet.title)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>autograde report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Worksheet: <strong>{}</strong> | {} questions | {} points | pass at {}% | {}</p>\n",
        html_escape(&report.worksheet.title),
        report.worksheet.question_count,
        report.worksheet.max_score,
        report.worksheet.pass_score,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Summary dashboard
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Graded</th><th>Failed</th><th>Mean</th><th>Median</th><th>Min</th><th>Max</th><th>Pass Rate</th><th>Needs Review</th></tr></thead>\n");
    html.push_str(&format!(
        "<tbody><tr><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}%</td><td>{}%</td><td>{}%</td><td>{:.1}%</td><td>{}</td></tr></tbody></table>\n",
        stats.submissions,
        report.failures.len(),
        stats.mean_percentage,
        stats.median_percentage,
        stats.min_percentage,
        stats.max_percentage,
        stats.pass_rate * 100.0,
        stats.needs_review,
    ));

    if !stats.per_question.is_empty() {
        html.push_str("<h2>Questions</h2>\n");
        html.push_str(&generate_bar_chart(&stats.per_question));

        html.push_str("<table class=\"questions\">\n");
        html.push_str("<thead><tr><th>Question</th><th>Max Points</th><th>Avg Points</th><th>Correct</th><th>Review</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for q in &stats.per_question {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.1}%</td><td>{:.1}%</td></tr>\n",
                html_escape(&q.question_id),
                q.max_points,
                q.avg_points,
                q.correct_rate * 100.0,
                q.review_rate * 100.0,
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    html.push_str("</section>\n");

    // Per-submission results
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Submissions</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Submission</th><th onclick=\"sortTable(1)\">Student</th><th onclick=\"sortTable(2)\">Score</th><th onclick=\"sortTable(3)\">Percentage</th><th onclick=\"sortTable(4)\">Status</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for s in &report.submissions {
        html.push_str(&submission_row(s));
    }
    for f in &report.failures {
        html.push_str(&format!(
            "<tr class=\"fail\"><td>{}</td><td>-</td><td>-</td><td>-</td><td title=\"{}\">error</td></tr>\n",
            html_escape(&f.submission_id),
            html_escape(&f.error)
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

fn submission_row(s: &GradedSubmission) -> String {
    let student = s.student.as_deref().map(html_escape).unwrap_or_else(|| "-".into());
    match &s.result {
        Some(r) => {
            let class = match s.status {
                SubmissionStatus::NeedsReview => "review",
                _ if r.passed => "pass",
                _ => "fail",
            };
            format!(
                "<tr class=\"{class}\"><td>{}</td><td>{student}</td><td>{}/{}</td><td>{}%</td><td>{}</td></tr>\n",
                html_escape(&s.submission_id),
                r.score,
                r.max_score,
                r.percentage,
                s.status,
            )
        }
        None => format!(
            "<tr><td>{}</td><td>{student}</td><td>-</td><td>-</td><td>{}</td></tr>\n",
            html_escape(&s.submission_id),
            s.status,
        ),
    }
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &GradeReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

/// Horizontal bar chart of per-question correct rates.
fn generate_bar_chart(per_question: &[QuestionStats]) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 160;

    let total_height = per_question.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, q) in per_question.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let rate = q.correct_rate.clamp(0.0, 1.0);
        let width = (rate * max_width as f64) as usize;

        let color = if rate >= 0.8 {
            "#22c55e"
        } else if rate >= 0.5 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&q.question_id)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            rate * 100.0
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --review: #fef9c3; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --review: #713f12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.review { background: var(--review); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
