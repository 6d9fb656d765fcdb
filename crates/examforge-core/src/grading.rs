//! Grading: the submission payload and the call to the grading agent.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::instrument;

use crate::answers::AnswerStore;
use crate::model::Exam;
use crate::result::ExamResult;
use crate::traits::{AgentRequest, ExamAgent};

/// What gets sent for grading: the exam and a snapshot of the answers.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub exam: Exam,
    pub answers: AnswerStore,
}

impl Submission {
    /// The grading prompt, embedding both documents as JSON.
    pub fn prompt(&self) -> Result<String> {
        let exam = serde_json::to_string(&self.exam).context("failed to serialize exam")?;
        let answers = serde_json::to_string(&self.answers.snapshot())
            .context("failed to serialize answers")?;
        Ok(format!(
            "Evaluate this exam submission. Return ONLY valid JSON with the exact structure specified.\n\n\
             Exam Data: {exam}\n\nUser Answers: {answers}"
        ))
    }
}

/// Send a submission to the grading agent. Makes exactly one call.
#[instrument(skip_all, fields(exam = %submission.exam.exam_title, agent = agent.name()))]
pub async fn grade(
    agent: &dyn ExamAgent,
    agent_id: &str,
    submission: &Submission,
) -> Result<ExamResult> {
    let request = AgentRequest {
        message: submission.prompt()?,
        agent_id: agent_id.to_string(),
    };
    let envelope = agent
        .invoke(&request)
        .await
        .context("failed to grade exam")?;
    let result: ExamResult = envelope.decode().context("failed to grade exam")?;
    tracing::info!(
        obtained = result.score_summary.total_marks_obtained,
        possible = result.score_summary.total_marks_possible,
        "exam graded"
    );
    Ok(result)
}
