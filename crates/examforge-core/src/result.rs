//! Grading result returned by the grading agent.
//!
//! Every field is optional on the wire; absent lists and maps come back empty
//! and section entries that are not arrays are skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A graded exam.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamResult {
    #[serde(default)]
    pub score_summary: ScoreSummary,
    /// Section type → score for that section.
    #[serde(default)]
    pub section_scores: BTreeMap<String, SectionScore>,
    /// Section type → per-question results.
    #[serde(default, deserialize_with = "lenient_question_results")]
    pub question_results: BTreeMap<String, Vec<QuestionResult>>,
    #[serde(default)]
    pub performance_analysis: PerformanceAnalysis,
    #[serde(default)]
    pub statistics: ResultStatistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreSummary {
    #[serde(default)]
    pub total_marks_obtained: f64,
    #[serde(default)]
    pub total_marks_possible: f64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub grade_description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks_obtained: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks_possible: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionResult {
    #[serde(default)]
    pub question_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    /// Whatever the agent echoed back: option key, text or boolean.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<serde_json::Value>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub marks_awarded: f64,
    #[serde(default)]
    pub marks_possible: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points_covered: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points_missed: Vec<String>,
}

impl QuestionResult {
    /// Question wording, falling back to the given section name.
    pub fn title<'a>(&'a self, section: &'a str) -> &'a str {
        self.question_text
            .as_deref()
            .or(self.statement.as_deref())
            .unwrap_or(section)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    #[serde(default)]
    pub strongest_sections: Vec<String>,
    #[serde(default)]
    pub weakest_sections: Vec<String>,
    #[serde(default)]
    pub topics_to_review: Vec<String>,
    #[serde(default)]
    pub overall_assessment: String,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    #[serde(default)]
    pub encouragement: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultStatistics {
    #[serde(default)]
    pub questions_attempted: u32,
    #[serde(default)]
    pub questions_unanswered: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub incorrect_answers: u32,
    #[serde(default)]
    pub accuracy_rate: f64,
}

/// Render an echoed answer for display.
pub fn answer_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(true) => "True".to_string(),
        serde_json::Value::Bool(false) => "False".to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_question_results<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<QuestionResult>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (section, value) in raw.unwrap_or_default() {
        let serde_json::Value::Array(items) = value else {
            tracing::warn!(%section, "question results are not a list, skipping");
            continue;
        };
        let parsed = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(q) => Some(q),
                Err(e) => {
                    tracing::warn!(%section, "skipping unreadable question result: {e}");
                    None
                }
            })
            .collect();
        out.insert(section, parsed);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_result() {
        let json = serde_json::json!({
            "score_summary": {
                "total_marks_obtained": 8,
                "total_marks_possible": 10,
                "percentage": 80.0,
                "grade": "B",
                "grade_description": "Good work"
            },
            "section_scores": {"mcq": {"percentage": 100.0}},
            "question_results": {
                "mcq": [{
                    "question_number": 1,
                    "question_text": "Q?",
                    "user_answer": "A",
                    "correct_answer": "A",
                    "is_correct": true,
                    "marks_awarded": 1,
                    "marks_possible": 1
                }],
                "true_false": [{"question_number": 2, "user_answer": false, "is_correct": false}]
            },
            "performance_analysis": {
                "overall_assessment": "Solid",
                "improvement_suggestions": ["Review osmosis"],
                "encouragement": "Keep going"
            },
            "statistics": {"questions_attempted": 2, "correct_answers": 1, "incorrect_answers": 1}
        });
        let result: ExamResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.score_summary.total_marks_obtained, 8.0);
        assert_eq!(result.section_scores["mcq"].percentage, Some(100.0));
        assert_eq!(result.question_results["mcq"][0].title("mcq"), "Q?");
        assert_eq!(
            answer_text(result.question_results["true_false"][0].user_answer.as_ref().unwrap()),
            "False"
        );
        assert_eq!(result.statistics.questions_unanswered, 0);
    }

    #[test]
    fn non_list_question_results_are_skipped() {
        let json = serde_json::json!({
            "question_results": {
                "mcq": [{"question_number": 1, "is_correct": true}],
                "matching": {"note": "not graded"}
            }
        });
        let result: ExamResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.question_results.len(), 1);
        assert!(result.performance_analysis.improvement_suggestions.is_empty());
    }
}
