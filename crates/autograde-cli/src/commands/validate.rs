//! The `autograde validate` command.

use std::path::PathBuf;

use anyhow::Result;

use autograde_core::parser;

pub fn execute(worksheet_path: PathBuf) -> Result<()> {
    let worksheets = if worksheet_path.is_dir() {
        parser::load_worksheet_directory(&worksheet_path)?
    } else {
        vec![parser::parse_worksheet(&worksheet_path)?]
    };

    let mut total_warnings = 0;

    for ws in &worksheets {
        println!(
            "Worksheet: {} ({} questions, {} points)",
            ws.title,
            ws.questions.len(),
            ws.max_score()
        );

        let warnings = parser::validate_worksheet(ws);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All worksheets valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
