//! Exam document model.
//!
//! Mirrors the JSON shape produced by the generation agent. Optional fields
//! default to empty so that sloppy documents degrade instead of failing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A generated exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    /// Title shown in the exam header.
    pub exam_title: String,
    /// Declared question count. Informational only.
    #[serde(default)]
    pub total_questions: u32,
    /// Declared maximum marks.
    #[serde(default)]
    pub total_marks: f64,
    /// Suggested duration; seeds the countdown.
    #[serde(default = "default_time_minutes")]
    pub time_suggested_minutes: u32,
    #[serde(default = "default_difficulty")]
    pub difficulty_level: String,
    #[serde(default)]
    pub sections: Sections,
    /// Passed through untouched to the grading agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<serde_json::Value>,
}

fn default_time_minutes() -> u32 {
    30
}

fn default_difficulty() -> String {
    "Mixed".to_string()
}

impl Exam {
    /// Countdown length in seconds.
    pub fn time_limit_secs(&self) -> u32 {
        self.time_suggested_minutes.saturating_mul(60)
    }

    /// Number of questions actually present across navigable sections.
    pub fn question_count(&self) -> usize {
        SectionKind::NAVIGABLE
            .iter()
            .filter_map(|kind| self.sections.get(*kind))
            .map(|s| s.questions.len())
            .sum()
    }
}

/// The five section slots of an exam. Any of them may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcq: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_blank: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_false: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_answer: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching: Option<Section>,
}

impl Sections {
    pub fn get(&self, kind: SectionKind) -> Option<&Section> {
        match kind {
            SectionKind::Mcq => self.mcq.as_ref(),
            SectionKind::FillBlank => self.fill_blank.as_ref(),
            SectionKind::TrueFalse => self.true_false.as_ref(),
            SectionKind::ShortAnswer => self.short_answer.as_ref(),
            SectionKind::Matching => self.matching.as_ref(),
        }
    }

    /// Present sections in canonical order.
    pub fn present(&self) -> impl Iterator<Item = (SectionKind, &Section)> {
        SectionKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|s| (kind, s)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// A homogeneous group of questions of one type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub section_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks_per_question: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_a_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_b_header: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MatchingItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_b_options: Vec<MatchingOption>,
}

/// The two structurally distinct section bodies.
#[derive(Debug, Clone, Copy)]
pub enum SectionBody<'a> {
    Questions(&'a [Question]),
    Matching {
        items: &'a [MatchingItem],
        options: &'a [MatchingOption],
    },
}

impl Section {
    /// View this section's body according to the slot it sits in.
    pub fn body(&self, kind: SectionKind) -> SectionBody<'_> {
        match kind {
            SectionKind::Matching => SectionBody::Matching {
                items: &self.items,
                options: &self.column_b_options,
            },
            _ => SectionBody::Questions(&self.questions),
        }
    }
}

/// A single question. Numbers are unique only within their section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    /// Used instead of `question_text` by true/false questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    /// Option key (`A`–`D`) to option text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_length: Option<String>,
}

impl Question {
    /// The question wording, whichever field carries it.
    pub fn text(&self) -> &str {
        self.question_text
            .as_deref()
            .or(self.statement.as_deref())
            .unwrap_or_default()
    }

    /// Options in key order; empty when the document omitted them.
    pub fn options(&self) -> Vec<(&str, &str)> {
        self.options
            .as_ref()
            .map(|opts| {
                opts.iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingItem {
    pub item_a: String,
    pub item_b_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingOption {
    pub id: String,
    pub text: String,
}

/// Section type. Also the first half of a question's global identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Mcq,
    FillBlank,
    TrueFalse,
    ShortAnswer,
    Matching,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Mcq,
        SectionKind::FillBlank,
        SectionKind::TrueFalse,
        SectionKind::ShortAnswer,
        SectionKind::Matching,
    ];

    /// Sections that take part in navigation, in presentation order.
    pub const NAVIGABLE: [SectionKind; 4] = [
        SectionKind::Mcq,
        SectionKind::FillBlank,
        SectionKind::TrueFalse,
        SectionKind::ShortAnswer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Mcq => "mcq",
            SectionKind::FillBlank => "fill_blank",
            SectionKind::TrueFalse => "true_false",
            SectionKind::ShortAnswer => "short_answer",
            SectionKind::Matching => "matching",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            SectionKind::Mcq => "Multiple Choice",
            SectionKind::FillBlank => "Fill in the Blanks",
            SectionKind::TrueFalse => "True or False",
            SectionKind::ShortAnswer => "Short Answer",
            SectionKind::Matching => "Matching",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "mcq" | "multiple_choice" => Ok(SectionKind::Mcq),
            "fill_blank" | "fill_in_the_blanks" => Ok(SectionKind::FillBlank),
            "true_false" => Ok(SectionKind::TrueFalse),
            "short_answer" => Ok(SectionKind::ShortAnswer),
            "matching" => Ok(SectionKind::Matching),
            other => Err(format!("unknown section type: {other}")),
        }
    }
}
