//! The exam session state machine.
//!
//! ```text
//! Configuring ──load──▶ InProgress ──confirm──▶ Submitting ──ok──▶ Reviewed
//!                           ▲                        │
//!                           └────────grading error───┘
//! ```
//!
//! Submission is split in two halves so the caller can keep navigating and
//! answering while the grading call is in flight: [`ExamSession::begin_submit`]
//! hands out the payload, [`ExamSession::finish_submit`] applies the outcome.
//! [`ExamSession::submit`] does both around a single agent call.

use std::fmt;

use serde::Serialize;

use crate::answers::{AnswerStore, AnswerValue};
use crate::error::SessionError;
use crate::grading::{self, Submission};
use crate::model::{Exam, SectionKind};
use crate::result::ExamResult;
use crate::sequencer::{flatten, FlattenedQuestion};
use crate::timer::{SessionTimer, Tick};
use crate::traits::ExamAgent;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No exam loaded yet.
    Configuring,
    InProgress,
    /// A grading call is in flight.
    Submitting,
    /// Graded. Terminal.
    Reviewed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Configuring => write!(f, "configuring"),
            SessionPhase::InProgress => write!(f, "in progress"),
            SessionPhase::Submitting => write!(f, "submitting"),
            SessionPhase::Reviewed => write!(f, "reviewed"),
        }
    }
}

/// The user's answer to "Submit exam? This cannot be undone."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// One cell of the jump-to-question navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionStatus {
    pub position: usize,
    pub kind: SectionKind,
    pub number: u32,
    pub answered: bool,
    pub current: bool,
}

#[derive(Debug)]
pub struct ExamSession {
    phase: SessionPhase,
    exam: Option<Exam>,
    topic: String,
    questions: Vec<FlattenedQuestion>,
    current_index: usize,
    answers: AnswerStore,
    /// Answers as handed to the grader; kept once reviewed.
    submitted: Option<AnswerStore>,
    timer: SessionTimer,
    result: Option<ExamResult>,
}

impl Default for ExamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Configuring,
            exam: None,
            topic: String::new(),
            questions: Vec::new(),
            current_index: 0,
            answers: AnswerStore::new(),
            submitted: None,
            timer: SessionTimer::new(),
            result: None,
        }
    }

    /// Register a callback for when the countdown reaches zero.
    ///
    /// Expiry is informational only; nothing is submitted automatically.
    pub fn on_time_expired(&mut self, callback: impl FnMut() + Send + 'static) {
        self.timer.on_expire(callback);
    }

    /// Load an exam and start the clock.
    pub fn load(&mut self, exam: Exam, topic: impl Into<String>) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Configuring {
            return Err(SessionError::AlreadyLoaded);
        }
        self.questions = flatten(&exam);
        self.current_index = 0;
        self.answers = AnswerStore::new();
        self.submitted = None;
        self.result = None;
        self.topic = topic.into();
        self.timer.start(exam.time_limit_secs());
        tracing::info!(
            title = %exam.exam_title,
            topic = %self.topic,
            questions = self.questions.len(),
            seconds = exam.time_limit_secs(),
            "exam session started"
        );
        self.exam = Some(exam);
        self.phase = SessionPhase::InProgress;
        Ok(())
    }

    // -- accessors ---------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn exam(&self) -> Option<&Exam> {
        self.exam.as_ref()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn questions(&self) -> &[FlattenedQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&FlattenedQuestion> {
        self.questions.get(self.current_index)
    }

    /// The stored answer for the current question, if any.
    pub fn current_answer(&self) -> Option<&AnswerValue> {
        self.current()
            .and_then(|q| self.answers.get(q.kind, q.number()))
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    /// The answers that were graded. `None` until the session is reviewed.
    pub fn submitted_answers(&self) -> Option<&AnswerStore> {
        match self.phase {
            SessionPhase::Reviewed => self.submitted.as_ref(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn time_expired(&self) -> bool {
        self.timer.is_expired()
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    // -- navigation --------------------------------------------------------

    /// Jump to `index`, clamped into the sequence.
    pub fn go_to(&mut self, index: usize) {
        if self.questions.is_empty() {
            return;
        }
        self.current_index = index.min(self.questions.len() - 1);
        tracing::debug!(index = self.current_index, "navigated");
    }

    pub fn next(&mut self) {
        self.go_to(self.current_index.saturating_add(1));
    }

    pub fn previous(&mut self) {
        self.go_to(self.current_index.saturating_sub(1));
    }

    /// Percentage through the sequence; zero when there are no questions.
    pub fn progress(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.current_index + 1) as f64 / self.questions.len() as f64 * 100.0
    }

    /// True only on the last question. Gates the submit action.
    pub fn is_complete(&self) -> bool {
        !self.questions.is_empty() && self.current_index == self.questions.len() - 1
    }

    /// Per-question answered flags for the navigator.
    pub fn status(&self) -> Vec<QuestionStatus> {
        self.questions
            .iter()
            .enumerate()
            .map(|(position, q)| QuestionStatus {
                position,
                kind: q.kind,
                number: q.number(),
                answered: self.answers.is_answered(q.kind, q.number()),
                current: position == self.current_index,
            })
            .collect()
    }

    // -- answers and time --------------------------------------------------

    /// Record an answer for the current question.
    ///
    /// A no-op when there are no questions. The answer's variant must match
    /// the current question's section type.
    pub fn record_answer(&mut self, value: AnswerValue) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Reviewed {
            return Err(SessionError::AlreadySubmitted);
        }
        let Some(question) = self.questions.get(self.current_index) else {
            return Ok(());
        };
        if value.kind() != question.kind {
            return Err(SessionError::AnswerKindMismatch {
                expected: question.kind,
                found: value.kind(),
            });
        }
        tracing::debug!(kind = %question.kind, number = question.number(), "answer recorded");
        self.answers.set(question.number(), value);
        Ok(())
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Tick {
        self.timer.tick()
    }

    // -- submission --------------------------------------------------------

    /// First half of submission: check the gate and take the payload.
    ///
    /// Returns `Ok(None)` when the user cancelled, leaving the session as it
    /// was.
    pub fn begin_submit(
        &mut self,
        confirmation: Confirmation,
    ) -> Result<Option<Submission>, SessionError> {
        match self.phase {
            SessionPhase::Configuring => return Err(SessionError::NoExamLoaded),
            SessionPhase::Submitting => return Err(SessionError::SubmissionInFlight),
            SessionPhase::Reviewed => return Err(SessionError::AlreadySubmitted),
            SessionPhase::InProgress => {}
        }
        if !self.is_complete() {
            return Err(SessionError::NotAtLastQuestion {
                index: self.current_index + 1,
                len: self.questions.len(),
            });
        }
        if confirmation == Confirmation::Cancelled {
            tracing::debug!("submission cancelled");
            return Ok(None);
        }
        let exam = self.exam.clone().ok_or(SessionError::NoExamLoaded)?;
        self.phase = SessionPhase::Submitting;
        self.submitted = Some(self.answers.clone());
        tracing::info!(answered = self.answers.answered_count(), "submitting exam");
        Ok(Some(Submission {
            exam,
            answers: self.answers.clone(),
        }))
    }

    /// Second half of submission: apply the grading outcome.
    ///
    /// On failure the session returns to `InProgress` so the user can retry.
    pub fn finish_submit(
        &mut self,
        outcome: anyhow::Result<ExamResult>,
    ) -> Result<&ExamResult, SessionError> {
        if self.phase != SessionPhase::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        match outcome {
            Ok(result) => {
                self.timer.stop();
                self.phase = SessionPhase::Reviewed;
                tracing::info!(
                    percentage = result.score_summary.percentage,
                    "exam reviewed"
                );
                Ok(&*self.result.insert(result))
            }
            Err(e) => {
                self.phase = SessionPhase::InProgress;
                self.submitted = None;
                tracing::warn!("grading failed, submission can be retried: {e:#}");
                Err(SessionError::GradingFailed(format!("{e:#}")))
            }
        }
    }

    /// Confirm, grade with exactly one agent call, and apply the outcome.
    ///
    /// Returns `Ok(None)` when the user cancelled.
    pub async fn submit(
        &mut self,
        confirmation: Confirmation,
        agent: &dyn ExamAgent,
        grading_agent_id: &str,
    ) -> Result<Option<&ExamResult>, SessionError> {
        let Some(submission) = self.begin_submit(confirmation)? else {
            return Ok(None);
        };
        let outcome = grading::grade(agent, grading_agent_id, &submission).await;
        self.finish_submit(outcome).map(Some)
    }

    // -- teardown ----------------------------------------------------------

    /// Stop the clock and discard the session.
    pub fn abandon(&mut self) {
        if self.phase != SessionPhase::Configuring {
            tracing::info!(phase = %self.phase, "exam session abandoned");
        }
        self.reset();
    }

    /// Reset for a new attempt, handing back the exam that was loaded.
    pub fn retake(&mut self) -> Option<Exam> {
        let exam = self.exam.take();
        self.reset();
        exam
    }

    fn reset(&mut self) {
        self.timer.stop();
        self.phase = SessionPhase::Configuring;
        self.exam = None;
        self.questions.clear();
        self.current_index = 0;
        self.answers = AnswerStore::new();
        self.submitted = None;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, Section, Sections};
    use crate::traits::{AgentEnvelope, AgentRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn section(title: &str, count: u32) -> Section {
        Section {
            section_title: title.into(),
            questions: (1..=count)
                .map(|n| Question {
                    question_number: n,
                    question_text: Some(format!("{title} question {n}")),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn exam(mcq: u32, fill_blank: u32) -> Exam {
        Exam {
            exam_title: "Biology".into(),
            total_questions: mcq + fill_blank,
            total_marks: 10.0,
            time_suggested_minutes: 2,
            difficulty_level: "Mixed".into(),
            sections: Sections {
                mcq: (mcq > 0).then(|| section("Multiple Choice", mcq)),
                fill_blank: (fill_blank > 0).then(|| section("Fill in the Blanks", fill_blank)),
                ..Default::default()
            },
            answer_key: None,
        }
    }

    fn loaded(mcq: u32, fill_blank: u32) -> ExamSession {
        let mut session = ExamSession::new();
        session.load(exam(mcq, fill_blank), "Bio").unwrap();
        session
    }

    /// Records every prompt and replies with a fixed envelope or error.
    struct GradingAgent {
        reply: Mutex<Option<anyhow::Result<AgentEnvelope>>>,
        fallback: AgentEnvelope,
        calls: AtomicU32,
        prompts: Mutex<Vec<String>>,
    }

    impl GradingAgent {
        fn succeeding() -> Self {
            Self {
                reply: Mutex::new(None),
                fallback: AgentEnvelope::ok(json!({
                    "score_summary": {
                        "total_marks_obtained": 3,
                        "total_marks_possible": 5,
                        "percentage": 60.0
                    }
                })),
                calls: AtomicU32::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing_once() -> Self {
            let agent = Self::succeeding();
            *agent.reply.lock().unwrap() = Some(Err(anyhow::anyhow!("network error: reset")));
            agent
        }
    }

    #[async_trait]
    impl ExamAgent for GradingAgent {
        fn name(&self) -> &str {
            "grading"
        }

        async fn invoke(&self, request: &AgentRequest) -> anyhow::Result<AgentEnvelope> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.message.clone());
            match self.reply.lock().unwrap().take() {
                Some(reply) => reply,
                None => Ok(self.fallback.clone()),
            }
        }
    }

    #[test]
    fn starts_configuring_and_loads() {
        let mut session = ExamSession::new();
        assert_eq!(session.phase(), SessionPhase::Configuring);
        session.load(exam(3, 2), "Bio").unwrap();
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.len(), 5);
        assert_eq!(session.remaining_seconds(), 120);
        assert!(matches!(
            session.load(exam(1, 0), "Again"),
            Err(SessionError::AlreadyLoaded)
        ));
    }

    #[test]
    fn navigation_clamps_at_boundaries() {
        let mut session = loaded(3, 2);
        session.previous();
        assert_eq!(session.current_index(), 0);
        session.go_to(99);
        assert_eq!(session.current_index(), 4);
        session.next();
        assert_eq!(session.current_index(), 4);
        session.go_to(3);
        assert_eq!(session.current().unwrap().kind, SectionKind::FillBlank);
        assert_eq!(session.current().unwrap().number(), 1);
    }

    #[test]
    fn progress_and_completion() {
        let mut session = loaded(10, 0);
        assert!((session.progress() - 10.0).abs() < f64::EPSILON);
        assert!(!session.is_complete());
        session.go_to(9);
        assert!((session.progress() - 100.0).abs() < f64::EPSILON);
        assert!(session.is_complete());
    }

    #[test]
    fn empty_sequence_is_inert() {
        let mut session = loaded(0, 0);
        session.go_to(3);
        session.next();
        assert_eq!(session.current_index(), 0);
        assert!(session.record_answer(AnswerValue::Choice('A')).is_ok());
        assert!(session.answers().is_empty());
        assert_eq!(session.progress(), 0.0);
        assert!(!session.is_complete());
    }

    #[test]
    fn answers_route_to_current_question() {
        let mut session = loaded(2, 1);
        session.record_answer(AnswerValue::Choice('B')).unwrap();
        session.go_to(2);
        session
            .record_answer(AnswerValue::FillBlank("ribosome".into()))
            .unwrap();
        assert_eq!(
            session.answers().get(SectionKind::Mcq, 1),
            Some(&AnswerValue::Choice('B'))
        );
        assert_eq!(
            session.current_answer(),
            Some(&AnswerValue::FillBlank("ribosome".into()))
        );

        let err = session
            .record_answer(AnswerValue::TrueFalse(true))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::AnswerKindMismatch {
                expected: SectionKind::FillBlank,
                found: SectionKind::TrueFalse
            }
        ));

        let status = session.status();
        assert!(status[0].answered);
        assert!(!status[1].answered);
        assert!(status[2].answered && status[2].current);
    }

    #[test]
    fn submit_is_gated_on_last_question_and_confirmation() {
        let mut session = loaded(2, 0);
        assert!(matches!(
            session.begin_submit(Confirmation::Confirmed),
            Err(SessionError::NotAtLastQuestion { index: 1, len: 2 })
        ));
        session.go_to(1);
        assert!(session
            .begin_submit(Confirmation::Cancelled)
            .unwrap()
            .is_none());
        assert_eq!(session.phase(), SessionPhase::InProgress);

        assert!(session
            .begin_submit(Confirmation::Confirmed)
            .unwrap()
            .is_some());
        assert_eq!(session.phase(), SessionPhase::Submitting);
        assert!(matches!(
            session.begin_submit(Confirmation::Confirmed),
            Err(SessionError::SubmissionInFlight)
        ));
    }

    #[test]
    fn navigation_and_answers_continue_while_submitting() {
        let mut session = loaded(2, 0);
        session.go_to(1);
        session.begin_submit(Confirmation::Confirmed).unwrap();
        session.previous();
        session.record_answer(AnswerValue::Choice('D')).unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.phase(), SessionPhase::Submitting);
    }

    #[test]
    fn payload_counts_only_answered_sections() {
        let mut session = loaded(3, 2);
        for i in 0..3 {
            session.go_to(i);
            session.record_answer(AnswerValue::Choice('A')).unwrap();
        }
        session.go_to(4);
        let submission = session
            .begin_submit(Confirmation::Confirmed)
            .unwrap()
            .unwrap();
        let snapshot = submission.answers.snapshot();
        assert_eq!(snapshot["mcq"].as_object().unwrap().len(), 3);
        assert_eq!(snapshot["fill_blank"].as_object().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn successful_submit_reviews_once() {
        let agent = GradingAgent::succeeding();
        let mut session = loaded(1, 0);
        session.record_answer(AnswerValue::Choice('C')).unwrap();

        let result = session
            .submit(Confirmation::Confirmed, &agent, "grader")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.score_summary.total_marks_obtained, 3.0);
        assert_eq!(session.phase(), SessionPhase::Reviewed);
        assert!(!session.timer().is_running());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
        assert!(agent.prompts.lock().unwrap()[0].contains(r#""mcq":{"1":"C"}"#));

        assert!(matches!(
            session.submit(Confirmation::Confirmed, &agent, "grader").await,
            Err(SessionError::AlreadySubmitted)
        ));
        assert!(matches!(
            session.record_answer(AnswerValue::Choice('A')),
            Err(SessionError::AlreadySubmitted)
        ));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_grading_allows_retry() {
        let agent = GradingAgent::failing_once();
        let mut session = loaded(1, 0);

        let err = session
            .submit(Confirmation::Confirmed, &agent, "grader")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::GradingFailed(_)));
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert!(session.result().is_none());

        session
            .submit(Confirmation::Confirmed, &agent, "grader")
            .await
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Reviewed);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_grading_payload_is_a_failure() {
        let agent = GradingAgent::succeeding();
        *agent.reply.lock().unwrap() = Some(Ok(AgentEnvelope::ok(json!("definitely not json"))));
        let mut session = loaded(1, 0);
        let err = session
            .submit(Confirmation::Confirmed, &agent, "grader")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
        assert_eq!(session.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn reviewed_session_keeps_the_graded_answers() {
        let mut session = loaded(2, 0);
        session.go_to(1);
        session.record_answer(AnswerValue::Choice('A')).unwrap();
        let submission = session
            .begin_submit(Confirmation::Confirmed)
            .unwrap()
            .unwrap();
        assert!(session.submitted_answers().is_none());

        session.record_answer(AnswerValue::Choice('D')).unwrap();
        session.finish_submit(Ok(ExamResult::default())).unwrap();

        let graded = session.submitted_answers().unwrap();
        assert_eq!(graded.snapshot(), submission.answers.snapshot());
        assert_eq!(graded.get(SectionKind::Mcq, 2), Some(&AnswerValue::Choice('A')));
        assert_eq!(session.answers().get(SectionKind::Mcq, 2), Some(&AnswerValue::Choice('D')));
    }

    #[test]
    fn failed_grading_forgets_the_submitted_answers() {
        let mut session = loaded(1, 0);
        session.begin_submit(Confirmation::Confirmed).unwrap();
        assert!(session.finish_submit(Err(anyhow::anyhow!("timeout"))).is_err());
        assert!(session.submitted_answers().is_none());
    }

    #[test]
    fn finish_without_begin_is_rejected() {
        let mut session = loaded(1, 0);
        assert!(matches!(
            session.finish_submit(Ok(ExamResult::default())),
            Err(SessionError::NotSubmitting)
        ));
    }

    #[test]
    fn timer_counts_down_without_forcing_submission() {
        let fired = std::sync::Arc::new(AtomicU32::new(0));
        let mut session = ExamSession::new();
        let counter = std::sync::Arc::clone(&fired);
        session.on_time_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        session.load(exam(1, 0), "Bio").unwrap();
        for _ in 0..120 {
            session.tick();
        }
        assert_eq!(session.remaining_seconds(), 0);
        assert!(session.time_expired());
        assert_eq!(session.tick(), Tick::Idle);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(session.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn retake_and_abandon_reset_the_session() {
        let mut session = loaded(2, 0);
        session.record_answer(AnswerValue::Choice('A')).unwrap();
        let exam = session.retake().unwrap();
        assert_eq!(session.phase(), SessionPhase::Configuring);
        assert!(session.answers().is_empty());
        assert!(!session.timer().is_running());

        session.load(exam, "Bio").unwrap();
        assert_eq!(session.remaining_seconds(), 120);
        session.abandon();
        assert_eq!(session.phase(), SessionPhase::Configuring);
        assert!(session.exam().is_none());
    }
}
