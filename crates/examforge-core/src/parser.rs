//! Exam document loading and validation.
//!
//! Exams are stored as the JSON document the generation agent returns. The
//! loader is lenient; [`validate_exam`] reports what looks wrong without
//! refusing the exam.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{Exam, SectionBody, SectionKind};

/// Load an exam from a JSON file.
pub fn load_exam(path: &Path) -> Result<Exam> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;
    parse_exam_str(&content, path)
}

/// Parse an exam from a JSON string (useful for testing).
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<Exam> {
    serde_json::from_str(content)
        .with_context(|| format!("failed to parse exam JSON: {}", source_path.display()))
}

/// Write an exam as pretty JSON, creating parent directories.
pub fn save_exam(exam: &Exam, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(exam).context("failed to serialize exam")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write exam to {}", path.display()))?;
    Ok(())
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The section the warning concerns, if any.
    pub section: Option<SectionKind>,
    pub message: String,
}

/// Check an exam for common issues.
pub fn validate_exam(exam: &Exam) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if exam.sections.is_empty() {
        warnings.push(ValidationWarning {
            section: None,
            message: "exam has no sections".into(),
        });
    }

    let actual = exam.question_count();
    if exam.total_questions as usize != actual {
        warnings.push(ValidationWarning {
            section: None,
            message: format!(
                "total_questions is {} but {} questions are present",
                exam.total_questions, actual
            ),
        });
    }

    if exam.time_suggested_minutes == 0 {
        warnings.push(ValidationWarning {
            section: None,
            message: "time_suggested_minutes is 0; the timer will expire immediately".into(),
        });
    }

    for (kind, section) in exam.sections.present() {
        match section.body(kind) {
            SectionBody::Questions(questions) => {
                let mut seen = HashSet::new();
                for q in questions {
                    if !seen.insert(q.question_number) {
                        warnings.push(ValidationWarning {
                            section: Some(kind),
                            message: format!("duplicate question number: {}", q.question_number),
                        });
                    }
                    if q.text().trim().is_empty() {
                        warnings.push(ValidationWarning {
                            section: Some(kind),
                            message: format!("question {} has no text", q.question_number),
                        });
                    }
                    if kind == SectionKind::Mcq && q.options().is_empty() {
                        warnings.push(ValidationWarning {
                            section: Some(kind),
                            message: format!("question {} has no options", q.question_number),
                        });
                    }
                }
            }
            SectionBody::Matching { items, options } => {
                let ids: HashSet<&str> = options.iter().map(|o| o.id.as_str()).collect();
                for item in items {
                    if !ids.contains(item.item_b_id.as_str()) {
                        warnings.push(ValidationWarning {
                            section: Some(kind),
                            message: format!(
                                "matching item '{}' points at unknown option '{}'",
                                item.item_a, item.item_b_id
                            ),
                        });
                    }
                }
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_EXAM: &str = r#"{
        "exam_title": "Cell Biology",
        "total_questions": 3,
        "total_marks": 5,
        "time_suggested_minutes": 15,
        "difficulty_level": "Medium",
        "sections": {
            "mcq": {
                "section_title": "Multiple Choice",
                "marks_per_question": 1,
                "questions": [
                    {"question_number": 1, "question_text": "Powerhouse of the cell?",
                     "options": {"A": "Nucleus", "B": "Mitochondria", "C": "Ribosome", "D": "Golgi"}}
                ]
            },
            "true_false": {
                "section_title": "True or False",
                "questions": [{"question_number": 1, "statement": "Plants have cell walls."}]
            },
            "short_answer": {
                "section_title": "Short Answer",
                "questions": [{"question_number": 1, "question_text": "Describe osmosis.",
                               "expected_length": "2-3 sentences"}]
            }
        }
    }"#;

    #[test]
    fn parse_valid_exam() {
        let exam = parse_exam_str(VALID_EXAM, &PathBuf::from("exam.json")).unwrap();
        assert_eq!(exam.exam_title, "Cell Biology");
        assert_eq!(exam.question_count(), 3);
        assert!(validate_exam(&exam).is_empty());
    }

    #[test]
    fn parse_malformed_exam() {
        let result = parse_exam_str("{ not json", &PathBuf::from("bad.json"));
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
    }

    #[test]
    fn warns_on_count_mismatch_and_missing_options() {
        let json = r#"{
            "exam_title": "Sloppy",
            "total_questions": 4,
            "sections": {
                "mcq": {
                    "section_title": "MCQ",
                    "questions": [
                        {"question_number": 1, "question_text": "First?"},
                        {"question_number": 1, "question_text": ""}
                    ]
                }
            }
        }"#;
        let exam = parse_exam_str(json, &PathBuf::from("sloppy.json")).unwrap();
        let warnings = validate_exam(&exam);
        let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("total_questions is 4")));
        assert!(messages.iter().any(|m| m.contains("duplicate question number")));
        assert!(messages.iter().any(|m| m.contains("has no options")));
        assert!(messages.iter().any(|m| m.contains("has no text")));
    }

    #[test]
    fn warns_on_empty_exam() {
        let exam =
            parse_exam_str(r#"{"exam_title": "Empty"}"#, &PathBuf::from("e.json")).unwrap();
        let warnings = validate_exam(&exam);
        assert!(warnings.iter().any(|w| w.message.contains("no sections")));
    }

    #[test]
    fn warns_on_dangling_matching_option() {
        let json = r#"{
            "exam_title": "Match",
            "sections": {
                "matching": {
                    "section_title": "Match",
                    "items": [{"item_a": "H2O", "item_b_id": "x"}],
                    "column_b_options": [{"id": "a", "text": "Water"}]
                }
            }
        }"#;
        let exam = parse_exam_str(json, &PathBuf::from("m.json")).unwrap();
        let warnings = validate_exam(&exam);
        assert!(warnings
            .iter()
            .any(|w| w.section == Some(SectionKind::Matching) && w.message.contains("'x'")));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("exam.json");
        let exam = parse_exam_str(VALID_EXAM, &PathBuf::from("exam.json")).unwrap();
        save_exam(&exam, &path).unwrap();
        let loaded = load_exam(&path).unwrap();
        assert_eq!(loaded.exam_title, exam.exam_title);
        assert_eq!(loaded.question_count(), 3);
    }
}
