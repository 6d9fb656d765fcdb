//! Plain-text report, suitable for saving next to the JSON or printing.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use examforge_core::report::ExamReport;
use examforge_core::result::answer_text;

/// Render a graded attempt as plain text.
pub fn generate_text(report: &ExamReport) -> String {
    let result = &report.result;
    let summary = &result.score_summary;
    let stats = &result.statistics;
    let analysis = &result.performance_analysis;
    let mut out = String::new();

    let _ = writeln!(out, "{}", report.exam.exam_title);
    let _ = writeln!(out, "{}", "=".repeat(report.exam.exam_title.chars().count().max(3)));
    let _ = writeln!(out, "Topic: {}", report.topic);
    let _ = writeln!(out, "Date: {}", report.created_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);

    let _ = write!(
        out,
        "Score: {} / {} ({:.1}%)",
        summary.total_marks_obtained, summary.total_marks_possible, summary.percentage
    );
    if !summary.grade.is_empty() {
        let _ = write!(out, "  Grade {}", summary.grade);
    }
    let _ = writeln!(out);
    if !summary.grade_description.is_empty() {
        let _ = writeln!(out, "{}", summary.grade_description);
    }
    let _ = writeln!(
        out,
        "Correct: {}  Incorrect: {}  Unanswered: {}",
        stats.correct_answers, stats.incorrect_answers, stats.questions_unanswered
    );

    if !result.section_scores.is_empty() {
        let _ = writeln!(out, "\nSections");
        for (section, score) in &result.section_scores {
            let percentage = score
                .percentage
                .map(|p| format!("{p:.1}%"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "  {:<14} {percentage}", section.replace('_', " "));
        }
    }

    if !analysis.overall_assessment.is_empty() {
        let _ = writeln!(out, "\nOverall: {}", analysis.overall_assessment);
    }
    if !analysis.improvement_suggestions.is_empty() {
        let _ = writeln!(out, "\nAreas to improve");
        for s in &analysis.improvement_suggestions {
            let _ = writeln!(out, "  - {s}");
        }
    }
    if !analysis.encouragement.is_empty() {
        let _ = writeln!(out, "\n{}", analysis.encouragement);
    }

    if !result.question_results.is_empty() {
        let _ = writeln!(out, "\nReview");
        for (section, questions) in &result.question_results {
            let label = section.replace('_', " ");
            for q in questions {
                let mark = if q.is_correct { "+" } else { "x" };
                let _ = writeln!(
                    out,
                    "  [{mark}] {label} Q{}. {} ({}/{})",
                    q.question_number,
                    q.title(&label),
                    q.marks_awarded,
                    q.marks_possible
                );
                if let Some(answer) = &q.user_answer {
                    let _ = writeln!(out, "      your answer: {}", answer_text(answer));
                }
                if !q.is_correct {
                    if let Some(correct) = &q.correct_answer {
                        let _ = writeln!(out, "      correct: {}", answer_text(correct));
                    }
                }
            }
        }
    }

    out
}

/// Write the plain-text report to a file.
pub fn write_text_report(report: &ExamReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_text(report))
        .with_context(|| format!("failed to write report to {}", path.display()))
}
