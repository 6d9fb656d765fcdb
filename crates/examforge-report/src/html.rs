//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::Result;
use std::path::Path;

use examforge_core::report::ExamReport;
use examforge_core::result::{answer_text, QuestionResult, SectionScore};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// CSS class for a score percentage.
fn grade_class(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "excellent"
    } else if percentage >= 80.0 {
        "good"
    } else if percentage >= 70.0 {
        "fair"
    } else {
        "poor"
    }
}

/// `fill_blank` → `fill blank`.
fn section_label(key: &str) -> String {
    key.replace('_', " ")
}

/// Generate an HTML report from a graded attempt.
pub fn generate_html(report: &ExamReport) -> String {
    let result = &report.result;
    let summary = &result.score_summary;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>examforge report: {}</title>\n",
        html_escape(&report.exam.exam_title)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.exam.exam_title)));
    html.push_str(&format!(
        "<p class=\"meta\">Topic: <strong>{}</strong> | {} | {}</p>\n",
        html_escape(&report.topic),
        html_escape(&report.exam.difficulty_level),
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Score
    html.push_str("<section class=\"score\">\n");
    html.push_str(&format!(
        "<p class=\"percentage {}\">{:.1}%</p>\n",
        grade_class(summary.percentage),
        summary.percentage
    ));
    if !summary.grade.is_empty() {
        html.push_str(&format!("<p class=\"grade\">Grade {}</p>\n", html_escape(&summary.grade)));
    }
    if !summary.grade_description.is_empty() {
        html.push_str(&format!("<h2>{}</h2>\n", html_escape(&summary.grade_description)));
    }
    html.push_str(&format!(
        "<p class=\"marks\">{} / {}</p>\n",
        summary.total_marks_obtained, summary.total_marks_possible
    ));
    html.push_str("</section>\n");

    // Breakdown
    let stats = &result.statistics;
    html.push_str("<section class=\"breakdown\">\n");
    html.push_str("<h2>Performance Breakdown</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Correct</th><th>Incorrect</th><th>Unanswered</th><th>Attempted</th></tr></thead>\n");
    html.push_str(&format!(
        "<tbody><tr><td class=\"pass\">{}</td><td class=\"fail\">{}</td><td>{}</td><td>{}</td></tr></tbody>\n",
        stats.correct_answers, stats.incorrect_answers, stats.questions_unanswered, stats.questions_attempted
    ));
    html.push_str("</table>\n");
    if !result.section_scores.is_empty() {
        html.push_str("<h2>Section Analysis</h2>\n");
        html.push_str(&generate_bar_chart(&result.section_scores));
    }
    html.push_str("</section>\n");

    // Feedback
    let analysis = &result.performance_analysis;
    html.push_str("<section class=\"feedback\">\n");
    html.push_str("<h2>Performance Feedback</h2>\n");
    if !analysis.overall_assessment.is_empty() {
        html.push_str(&format!(
            "<h3>Overall Assessment</h3>\n<p>{}</p>\n",
            html_escape(&analysis.overall_assessment)
        ));
    }
    push_list(&mut html, "Areas to Improve", &analysis.improvement_suggestions, "");
    push_list(&mut html, "Topics to Review", &analysis.topics_to_review, "");
    if !analysis.encouragement.is_empty() {
        html.push_str(&format!(
            "<h3>Encouragement</h3>\n<p class=\"encouragement\">{}</p>\n",
            html_escape(&analysis.encouragement)
        ));
    }
    html.push_str("</section>\n");

    // Question review
    html.push_str("<section class=\"review\">\n");
    html.push_str("<h2>Detailed Review</h2>\n");
    for (section, questions) in &result.question_results {
        for q in questions {
            html.push_str(&question_block(section, q));
        }
    }
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Submitted Answers</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(&report.answers).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ExamReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn push_list(html: &mut String, title: &str, items: &[String], class: &str) {
    if items.is_empty() {
        return;
    }
    html.push_str(&format!("<h3>{title}</h3>\n<ul class=\"{class}\">\n"));
    for item in items {
        html.push_str(&format!("<li>{}</li>\n", html_escape(item)));
    }
    html.push_str("</ul>\n");
}

fn question_block(section: &str, q: &QuestionResult) -> String {
    let (class, mark) = if q.is_correct {
        ("pass", "&#x2714;")
    } else {
        ("fail", "&#x2718;")
    };
    let label = section_label(section);
    let mut block = format!(
        "<details class=\"question {class}\">\n<summary>{mark} Q{}. {} <span class=\"marks\">{}/{} marks</span></summary>\n",
        q.question_number,
        html_escape(q.title(&label)),
        q.marks_awarded,
        q.marks_possible
    );

    if let Some(answer) = q.user_answer.as_ref().map(answer_text).filter(|a| !a.is_empty()) {
        block.push_str(&format!(
            "<p><strong>Your Answer:</strong> {}</p>\n",
            html_escape(&answer)
        ));
    }
    if !q.is_correct {
        if let Some(correct) = q.correct_answer.as_ref().map(answer_text).filter(|a| !a.is_empty()) {
            block.push_str(&format!(
                "<p><strong>Correct Answer:</strong> {}</p>\n",
                html_escape(&correct)
            ));
        }
    }
    if let Some(feedback) = &q.feedback {
        block.push_str(&format!(
            "<p><strong>Feedback:</strong> {}</p>\n",
            html_escape(feedback)
        ));
    }
    if let Some(explanation) = &q.explanation {
        block.push_str(&format!(
            "<p><strong>Explanation:</strong> {}</p>\n",
            html_escape(explanation)
        ));
    }
    push_list(&mut block, "Key Points Covered", &q.key_points_covered, "covered");
    push_list(&mut block, "Key Points Missed", &q.key_points_missed, "missed");
    block.push_str("</details>\n");
    block
}

fn generate_bar_chart(sections: &std::collections::BTreeMap<String, SectionScore>) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 10;
    let label_width = 160;

    let total_height = sections.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (section, score)) in sections.iter().enumerate() {
        let percentage = score.percentage.unwrap_or(0.0).clamp(0.0, 100.0);
        let y = i * (bar_height + padding) + padding;
        let width = (percentage / 100.0 * max_width as f64) as usize;

        let color = if percentage >= 80.0 {
            "#22c55e"
        } else if percentage >= 60.0 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&section_label(section))
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            percentage
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0 auto; max-width: 960px; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.score { text-align: center; }
.percentage { font-size: 3rem; font-weight: bold; margin: 0; }
.excellent { color: #16a34a; }
.good { color: #2563eb; }
.fair { color: #ca8a04; }
.poor { color: #dc2626; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.question { border: 1px solid var(--border); border-radius: 8px; padding: 0.5rem 1rem; margin: 0.5rem 0; }
.question .marks { color: #6b7280; font-size: 0.8rem; margin-left: 0.5rem; }
.covered li { color: #15803d; }
.missed li { color: #b91c1c; }
.encouragement { font-style: italic; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::model::{Exam, Sections};
    use examforge_core::result::ExamResult;

    fn make_test_report() -> ExamReport {
        let result: ExamResult = serde_json::from_value(serde_json::json!({
            "score_summary": {
                "total_marks_obtained": 7,
                "total_marks_possible": 10,
                "percentage": 70.0,
                "grade": "C",
                "grade_description": "Satisfactory"
            },
            "section_scores": {"fill_blank": {"percentage": 50.0}, "mcq": {"percentage": 90.0}},
            "question_results": {
                "mcq": [{
                    "question_number": 1,
                    "question_text": "Is 2 < 3?",
                    "user_answer": "A",
                    "correct_answer": "A",
                    "is_correct": true,
                    "marks_awarded": 1,
                    "marks_possible": 1
                }],
                "short_answer": [{
                    "question_number": 1,
                    "user_answer": "Because <script>",
                    "correct_answer": "Diffusion",
                    "is_correct": false,
                    "marks_awarded": 0,
                    "marks_possible": 3,
                    "key_points_missed": ["membrane"]
                }]
            },
            "performance_analysis": {
                "overall_assessment": "Decent effort",
                "improvement_suggestions": ["Revise transport"],
                "encouragement": "Keep it up"
            },
            "statistics": {"questions_attempted": 2, "correct_answers": 1, "incorrect_answers": 1}
        }))
        .unwrap();

        ExamReport {
            id: uuid::Uuid::nil(),
            created_at: chrono::Utc::now(),
            topic: "Cells & Membranes".into(),
            exam: Exam {
                exam_title: "Biology Unit 3".into(),
                total_questions: 2,
                total_marks: 10.0,
                time_suggested_minutes: 20,
                difficulty_level: "Medium".into(),
                sections: Sections::default(),
                answer_key: None,
            },
            answers: serde_json::json!({"mcq": {"1": "A"}}),
            result,
        }
    }

    #[test]
    fn html_report_contains_required_elements() {
        let html = generate_html(&make_test_report());

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Biology Unit 3"));
        assert!(html.contains("70.0%"));
        assert!(html.contains("Satisfactory"));
        assert!(html.contains("fill blank"));
        assert!(html.contains("Revise transport"));
        assert!(html.contains("Key Points Missed"));
    }

    #[test]
    fn html_escapes_user_content() {
        let html = generate_html(&make_test_report());
        assert!(html.contains("Cells &amp; Membranes"));
        assert!(html.contains("Is 2 &lt; 3?"));
        assert!(html.contains("Because &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn correct_answer_only_shown_when_wrong() {
        let html = generate_html(&make_test_report());
        assert_eq!(html.matches("Correct Answer:").count(), 1);
        assert!(html.contains("Diffusion"));
    }

    #[test]
    fn untitled_question_falls_back_to_section() {
        let html = generate_html(&make_test_report());
        assert!(html.contains("Q1. short answer"));
    }

    #[test]
    fn grade_classes() {
        assert_eq!(grade_class(95.0), "excellent");
        assert_eq!(grade_class(80.0), "good");
        assert_eq!(grade_class(70.0), "fair");
        assert_eq!(grade_class(10.0), "poor");
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        write_html_report(&report, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
