//! A saved exam attempt: the exam, the submitted answers and the grade,
//! persisted as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::AnswerStore;
use crate::model::Exam;
use crate::result::ExamResult;

/// A complete graded attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the attempt was graded.
    pub created_at: DateTime<Utc>,
    pub topic: String,
    pub exam: Exam,
    /// The answer snapshot exactly as sent for grading.
    pub answers: serde_json::Value,
    pub result: ExamResult,
}

impl ExamReport {
    pub fn new(topic: &str, exam: &Exam, answers: &AnswerStore, result: &ExamResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            topic: topic.to_string(),
            exam: exam.clone(),
            answers: answers.snapshot(),
            result: result.clone(),
        }
    }

    /// Suggested file stem, e.g. `exam-3f2c9a1b`.
    pub fn file_stem(&self) -> String {
        let id = self.id.simple().to_string();
        format!("exam-{}", &id[..8])
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
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
        let report: ExamReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::AnswerValue;
    use crate::model::Sections;

    fn report() -> ExamReport {
        let exam = Exam {
            exam_title: "Optics".into(),
            total_questions: 0,
            total_marks: 4.0,
            time_suggested_minutes: 10,
            difficulty_level: "Hard".into(),
            sections: Sections::default(),
            answer_key: None,
        };
        let mut answers = AnswerStore::new();
        answers.set(2, AnswerValue::TrueFalse(false));
        let mut result = ExamResult::default();
        result.score_summary.percentage = 75.0;
        ExamReport::new("Light", &exam, &answers, &result)
    }

    #[test]
    fn captures_answer_snapshot() {
        let report = report();
        assert_eq!(report.answers["true_false"]["2"], false);
        assert_eq!(report.file_stem().len(), "exam-".len() + 8);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("r.json");
        let report = report();
        report.save_json(&path).unwrap();

        let loaded = ExamReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.topic, "Light");
        assert_eq!(loaded.result.score_summary.percentage, 75.0);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = ExamReport::load_json(Path::new("/nonexistent/report.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read report"));
    }
}
