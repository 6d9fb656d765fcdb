//! Error types shared across examforge crates.
//!
//! `AgentError` lives here rather than in `examforge-agents` so callers can
//! downcast an `anyhow::Error` and classify it for retry decisions without
//! string matching.

use thiserror::Error;

use crate::model::SectionKind;

/// Errors that can occur when talking to a generation or grading agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested agent does not exist.
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The envelope came back with `success: false` or no response.
    #[error("agent rejected the request: {0}")]
    Rejected(String),

    /// The payload could not be decoded into the expected document.
    #[error("malformed agent payload: {0}")]
    MalformedPayload(String),
}

impl AgentError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AgentError::AuthenticationFailed(_) | AgentError::AgentNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            AgentError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Generation input rejected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("please upload content or paste text")]
    EmptyContent,

    #[error("please enter a topic name")]
    MissingTopic,

    #[error("{field} must be between {min} and {max}, got {value}")]
    CountOutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("invalid answer for {kind}: {reason}")]
    InvalidAnswer { kind: SectionKind, reason: String },
}

/// Errors raised by `ExamSession` operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no exam is loaded")]
    NoExamLoaded,

    #[error("an exam is already in progress")]
    AlreadyLoaded,

    #[error("submission is only available on the last question ({index} of {len})")]
    NotAtLastQuestion { index: usize, len: usize },

    #[error("a submission is already being graded")]
    SubmissionInFlight,

    #[error("this exam has already been submitted")]
    AlreadySubmitted,

    #[error("no submission is in flight")]
    NotSubmitting,

    #[error("answer for {found} does not fit a {expected} question")]
    AnswerKindMismatch {
        expected: SectionKind,
        found: SectionKind,
    },

    #[error("grading failed: {0}")]
    GradingFailed(String),
}
