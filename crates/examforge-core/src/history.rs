//! Exam history: an append-only, most-recent-first log persisted under a
//! single key of a key-value store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::result::ExamResult;

/// The store key holding the history list.
pub const HISTORY_KEY: &str = "examHistory";

/// Minimal persistent key-value storage.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn write(&mut self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// In-memory store, mostly for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// A JSON file holding one object of key → value.
///
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn write(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);
        let json = serde_json::to_string_pretty(&all).context("failed to serialize store")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// One completed exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Epoch milliseconds at completion, as a string.
    pub id: String,
    pub topic: String,
    /// Display date, `M/D/YYYY`.
    pub date: String,
    /// Marks obtained.
    pub score: f64,
    #[serde(rename = "totalMarks")]
    pub total_marks: f64,
}

impl HistoryEntry {
    pub fn from_result(topic: &str, result: &ExamResult, now: DateTime<Local>) -> Self {
        Self {
            id: now.timestamp_millis().to_string(),
            topic: topic.to_string(),
            date: now.format("%-m/%-d/%Y").to_string(),
            score: result.score_summary.total_marks_obtained,
            total_marks: result.score_summary.total_marks_possible,
        }
    }

    /// Score as a percentage of total marks; zero when there are none.
    pub fn percentage(&self) -> f64 {
        if self.total_marks > 0.0 {
            self.score / self.total_marks * 100.0
        } else {
            0.0
        }
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_percentage(self.percentage())
    }
}

/// Coarse rating used to colour scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            ScoreBand::Good
        } else if percentage >= 60.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::Good => write!(f, "good"),
            ScoreBand::Fair => write!(f, "fair"),
            ScoreBand::Poor => write!(f, "poor"),
        }
    }
}

/// Dashboard figures over the whole history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub exams_taken: usize,
    /// Mean of raw scores, not percentages.
    pub average_score: f64,
    pub best_percentage: f64,
}

/// The history log over a store.
#[derive(Debug)]
pub struct HistoryLog<S> {
    store: S,
    entries: Vec<HistoryEntry>,
}

impl<S: KeyValueStore> HistoryLog<S> {
    /// Read the log from the store. A missing key is an empty log.
    pub fn load(store: S) -> Result<Self> {
        let entries: Vec<HistoryEntry> = match store.read(HISTORY_KEY)? {
            Some(value) => {
                serde_json::from_value(value).context("failed to parse exam history")?
            }
            None => Vec::new(),
        };
        tracing::debug!(entries = entries.len(), "loaded exam history");
        Ok(Self { store, entries })
    }

    /// Prepend an entry and persist the whole log.
    ///
    /// The in-memory log changes only once the store accepted the write.
    pub fn append(&mut self, entry: HistoryEntry) -> Result<()> {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.push(entry);
        entries.extend(self.entries.iter().cloned());
        let value = serde_json::to_value(&entries).context("failed to serialize history")?;
        self.store.write(HISTORY_KEY, value)?;
        self.entries = entries;
        tracing::info!(entries = self.entries.len(), "exam history saved");
        Ok(())
    }

    /// All entries, most recent first.
    pub fn all(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> HistorySummary {
        if self.entries.is_empty() {
            return HistorySummary::default();
        }
        let total: f64 = self.entries.iter().map(|e| e.score).sum();
        let best = self
            .entries
            .iter()
            .map(HistoryEntry::percentage)
            .fold(0.0, f64::max);
        HistorySummary {
            exams_taken: self.entries.len(),
            average_score: total / self.entries.len() as f64,
            best_percentage: best,
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
