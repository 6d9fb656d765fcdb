//! The `examforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

use examforge_core::parser;

pub fn execute(exam_path: PathBuf) -> Result<()> {
    let exam = parser::load_exam(&exam_path)?;

    println!(
        "Exam: {} ({} questions, {} sections, {} min)",
        exam.exam_title,
        exam.question_count(),
        exam.sections.present().count(),
        exam.time_suggested_minutes
    );

    let warnings = parser::validate_exam(&exam);
    for w in &warnings {
        let prefix = w
            .section
            .map(|kind| format!("  [{kind}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Exam is valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
