//! Exam generation: input validation, prompt construction, and decoding the
//! generation agent's reply into an [`Exam`].

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AgentError, InputError};
use crate::model::Exam;
use crate::traits::{invoke_with_retry, AgentRequest, ExamAgent, RetryPolicy};

/// Requested difficulty of a generated exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Mixed,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
            Difficulty::Mixed => write!(f, "Mixed"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "mixed" => Ok(Difficulty::Mixed),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Shape of the exam to request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamBlueprint {
    #[serde(default = "default_mcq")]
    pub mcq_count: u32,
    #[serde(default = "default_fill_blank")]
    pub fill_blank_count: u32,
    #[serde(default = "default_short_answer")]
    pub short_answer_count: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
}

fn default_mcq() -> u32 {
    10
}
fn default_fill_blank() -> u32 {
    5
}
fn default_short_answer() -> u32 {
    3
}

impl Default for ExamBlueprint {
    fn default() -> Self {
        Self {
            mcq_count: default_mcq(),
            fill_blank_count: default_fill_blank(),
            short_answer_count: default_short_answer(),
            difficulty: Difficulty::default(),
        }
    }
}

impl ExamBlueprint {
    pub const MCQ_RANGE: (u32, u32) = (5, 20);
    pub const FILL_BLANK_RANGE: (u32, u32) = (3, 10);
    pub const SHORT_ANSWER_RANGE: (u32, u32) = (2, 5);

    pub fn validate(&self) -> Result<(), InputError> {
        check_range("mcq_count", self.mcq_count, Self::MCQ_RANGE)?;
        check_range("fill_blank_count", self.fill_blank_count, Self::FILL_BLANK_RANGE)?;
        check_range(
            "short_answer_count",
            self.short_answer_count,
            Self::SHORT_ANSWER_RANGE,
        )
    }
}

fn check_range(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), InputError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(InputError::CountOutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Everything the generation agent needs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    /// Raw study notes.
    pub content: String,
    pub blueprint: ExamBlueprint,
}

impl GenerationRequest {
    /// Reject requests that must not reach the network.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.content.trim().is_empty() {
            return Err(InputError::EmptyContent);
        }
        if self.topic.trim().is_empty() {
            return Err(InputError::MissingTopic);
        }
        self.blueprint.validate()
    }

    pub fn prompt(&self) -> String {
        let b = &self.blueprint;
        format!(
            "Generate a comprehensive exam based on these notes. Return ONLY valid JSON with the exact structure specified.\n\n\
             Topic: {}\n\
             Multiple choice questions: {}\n\
             Fill in the blank questions: {}\n\
             Short answer questions: {}\n\
             Difficulty: {}\n\n\
             Notes:\n{}",
            self.topic.trim(),
            b.mcq_count,
            b.fill_blank_count,
            b.short_answer_count,
            b.difficulty,
            self.content
        )
    }
}

/// Ask the generation agent for an exam.
///
/// Input problems fail before any call is made. Transport failures are
/// retried per `policy`; a malformed reply is not.
#[instrument(skip_all, fields(topic = %request.topic, agent = agent.name()))]
pub async fn generate_exam(
    agent: &dyn ExamAgent,
    agent_id: &str,
    request: &GenerationRequest,
    policy: &RetryPolicy,
) -> Result<Exam> {
    request.validate()?;

    let call = AgentRequest {
        message: request.prompt(),
        agent_id: agent_id.to_string(),
    };
    let envelope = invoke_with_retry(agent, &call, policy)
        .await
        .context("failed to generate exam")?;
    let exam: Exam = envelope.decode().context("failed to generate exam")?;

    if exam.sections.is_empty() {
        return Err(
            anyhow::Error::new(AgentError::MalformedPayload("exam has no sections".into()))
                .context("failed to generate exam"),
        );
    }

    tracing::info!(
        title = %exam.exam_title,
        questions = exam.question_count(),
        minutes = exam.time_suggested_minutes,
        "exam generated"
    );
    Ok(exam)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AgentEnvelope;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedAgent {
        envelope: AgentEnvelope,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ExamAgent for FixedAgent {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn invoke(&self, request: &AgentRequest) -> anyhow::Result<AgentEnvelope> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.agent_id, "gen-agent");
            Ok(self.envelope.clone())
        }
    }

    fn agent(envelope: AgentEnvelope) -> FixedAgent {
        FixedAgent {
            envelope,
            calls: AtomicU32::new(0),
        }
    }

    fn request(topic: &str, content: &str) -> GenerationRequest {
        GenerationRequest {
            topic: topic.into(),
            content: content.into(),
            blueprint: ExamBlueprint::default(),
        }
    }

    #[test]
    fn validation_order_and_ranges() {
        assert_eq!(
            request("", "  ").validate(),
            Err(InputError::EmptyContent)
        );
        assert_eq!(
            request(" ", "notes").validate(),
            Err(InputError::MissingTopic)
        );
        let mut req = request("Bio", "notes");
        req.blueprint.short_answer_count = 9;
        assert!(matches!(
            req.validate(),
            Err(InputError::CountOutOfRange {
                field: "short_answer_count",
                ..
            })
        ));
    }

    #[test]
    fn prompt_embeds_notes_and_blueprint() {
        let prompt = request("Photosynthesis", "Light reactions happen in thylakoids.").prompt();
        assert!(prompt.contains("Light reactions happen in thylakoids."));
        assert!(prompt.contains("Multiple choice questions: 10"));
        assert!(prompt.contains("Difficulty: Mixed"));
    }

    #[test]
    fn difficulty_parse() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("brutal".parse::<Difficulty>().is_err());
    }

    #[tokio::test]
    async fn invalid_input_makes_no_call() {
        let agent = agent(AgentEnvelope::ok(json!({})));
        let err = generate_exam(&agent, "gen-agent", &request("", "notes"), &RetryPolicy::none())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("topic"));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decodes_exam_from_result() {
        let agent = agent(AgentEnvelope::ok(json!({
            "result": {
                "exam_title": "Biology Quiz",
                "time_suggested_minutes": 20,
                "sections": {
                    "mcq": {
                        "section_title": "MCQ",
                        "questions": [{"question_number": 1, "question_text": "?",
                                       "options": {"A": "a", "B": "b", "C": "c", "D": "d"}}]
                    }
                }
            }
        })));
        let exam = generate_exam(&agent, "gen-agent", &request("Bio", "notes"), &RetryPolicy::none())
            .await
            .unwrap();
        assert_eq!(exam.exam_title, "Biology Quiz");
        assert_eq!(exam.question_count(), 1);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exam_without_sections_is_rejected() {
        let agent = agent(AgentEnvelope::ok(json!({"exam_title": "Empty", "sections": {}})));
        let err = generate_exam(&agent, "gen-agent", &request("Bio", "notes"), &RetryPolicy::none())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("no sections"));
    }

    #[tokio::test]
    async fn failed_envelope_surfaces_error() {
        let agent = agent(AgentEnvelope::default());
        let err = generate_exam(&agent, "gen-agent", &request("Bio", "notes"), &RetryPolicy::none())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("rejected"));
    }
}
