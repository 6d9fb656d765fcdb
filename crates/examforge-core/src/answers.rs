//! Per-question answer capture.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::InputError;
use crate::model::SectionKind;

/// An answer, shaped by the type of question it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    /// Selected option key, always uppercase `A`–`D`.
    Choice(char),
    FillBlank(String),
    TrueFalse(bool),
    ShortAnswer(String),
}

impl AnswerValue {
    /// The section type this answer belongs to.
    pub fn kind(&self) -> SectionKind {
        match self {
            AnswerValue::Choice(_) => SectionKind::Mcq,
            AnswerValue::FillBlank(_) => SectionKind::FillBlank,
            AnswerValue::TrueFalse(_) => SectionKind::TrueFalse,
            AnswerValue::ShortAnswer(_) => SectionKind::ShortAnswer,
        }
    }

    /// Build a choice answer from an option key, case-insensitively.
    pub fn choice(key: char) -> Result<Self, InputError> {
        let key = key.to_ascii_uppercase();
        if ('A'..='D').contains(&key) {
            Ok(AnswerValue::Choice(key))
        } else {
            Err(InputError::InvalidAnswer {
                kind: SectionKind::Mcq,
                reason: format!("'{key}' is not an option key (A-D)"),
            })
        }
    }

    /// Parse free-form user input for a question of the given kind.
    pub fn parse(kind: SectionKind, input: &str) -> Result<Self, InputError> {
        let trimmed = input.trim();
        match kind {
            SectionKind::Mcq => {
                let mut chars = trimmed.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::choice(c),
                    _ => Err(InputError::InvalidAnswer {
                        kind,
                        reason: "expected a single option key (A-D)".into(),
                    }),
                }
            }
            SectionKind::TrueFalse => match trimmed.to_lowercase().as_str() {
                "t" | "true" | "y" | "yes" => Ok(AnswerValue::TrueFalse(true)),
                "f" | "false" | "n" | "no" => Ok(AnswerValue::TrueFalse(false)),
                _ => Err(InputError::InvalidAnswer {
                    kind,
                    reason: "expected true or false".into(),
                }),
            },
            SectionKind::FillBlank => Ok(AnswerValue::FillBlank(input.to_string())),
            SectionKind::ShortAnswer => Ok(AnswerValue::ShortAnswer(input.to_string())),
            SectionKind::Matching => Err(InputError::InvalidAnswer {
                kind,
                reason: "matching questions are not answered per question".into(),
            }),
        }
    }

    /// Free-text answers left empty do not count as answered.
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::FillBlank(s) | AnswerValue::ShortAnswer(s) => s.trim().is_empty(),
            AnswerValue::Choice(_) | AnswerValue::TrueFalse(_) => false,
        }
    }

    /// The value as it appears in the grading payload.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AnswerValue::Choice(c) => serde_json::Value::String(c.to_string()),
            AnswerValue::FillBlank(s) | AnswerValue::ShortAnswer(s) => {
                serde_json::Value::String(s.clone())
            }
            AnswerValue::TrueFalse(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Choice(c) => write!(f, "{c}"),
            AnswerValue::FillBlank(s) | AnswerValue::ShortAnswer(s) => f.write_str(s),
            AnswerValue::TrueFalse(true) => f.write_str("True"),
            AnswerValue::TrueFalse(false) => f.write_str("False"),
        }
    }
}

impl Serialize for AnswerValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnswerValue::Choice(c) => serializer.collect_str(c),
            AnswerValue::FillBlank(s) | AnswerValue::ShortAnswer(s) => serializer.serialize_str(s),
            AnswerValue::TrueFalse(b) => serializer.serialize_bool(*b),
        }
    }
}

/// Answers keyed by (section type, question number).
///
/// The section type is taken from the answer's own variant, so an answer can
/// never be filed under a section of a different shape. Entries are
/// overwritten but never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerStore {
    entries: BTreeMap<SectionKind, BTreeMap<u32, AnswerValue>>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the answer for question `number`. Returns the
    /// previous value, if any.
    pub fn set(&mut self, number: u32, value: AnswerValue) -> Option<AnswerValue> {
        self.entries
            .entry(value.kind())
            .or_default()
            .insert(number, value)
    }

    pub fn get(&self, kind: SectionKind, number: u32) -> Option<&AnswerValue> {
        self.entries.get(&kind).and_then(|m| m.get(&number))
    }

    pub fn is_answered(&self, kind: SectionKind, number: u32) -> bool {
        self.get(kind, number).is_some_and(|v| !v.is_blank())
    }

    /// Number of stored entries for one section.
    pub fn len_for(&self, kind: SectionKind) -> usize {
        self.entries.get(&kind).map_or(0, BTreeMap::len)
    }

    /// Number of entries that count as answered, across all sections.
    pub fn answered_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(BTreeMap::values)
            .filter(|v| !v.is_blank())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// The grading payload: one object per section type, each mapping
    /// question number to answer.
    pub fn snapshot(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for kind in SectionKind::ALL {
            let section: serde_json::Map<String, serde_json::Value> = self
                .entries
                .get(&kind)
                .into_iter()
                .flatten()
                .map(|(n, v)| (n.to_string(), v.to_json()))
                .collect();
            root.insert(kind.as_str().to_string(), section.into());
        }
        serde_json::Value::Object(root)
    }
}

impl Serialize for AnswerStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let empty = BTreeMap::new();
        let mut map = serializer.serialize_map(Some(SectionKind::ALL.len()))?;
        for kind in SectionKind::ALL {
            map.serialize_entry(kind.as_str(), self.entries.get(&kind).unwrap_or(&empty))?;
        }
        map.end()
    }
}
