//! The agent seam: the trait every generation/grading backend implements,
//! plus the envelope convention both calls share.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

// ---------------------------------------------------------------------------
// Agent trait
// ---------------------------------------------------------------------------

/// A remote AI agent reachable with a prompt and an agent identifier.
#[async_trait]
pub trait ExamAgent: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Send one prompt and return the raw envelope.
    async fn invoke(&self, request: &AgentRequest) -> anyhow::Result<AgentEnvelope>;
}

/// Body of an agent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub message: String,
    pub agent_id: String,
}

/// The `{ success, response }` wrapper both agent calls return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentEnvelope {
    /// Wrap a payload in a successful envelope.
    pub fn ok(response: serde_json::Value) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
        }
    }

    /// Extract the document: `response.result` if present, else `response`.
    ///
    /// A string payload is treated as JSON text, optionally inside a fenced
    /// code block.
    pub fn into_payload(self) -> Result<serde_json::Value, AgentError> {
        if !self.success {
            return Err(AgentError::Rejected(
                self.error
                    .unwrap_or_else(|| "agent reported failure".to_string()),
            ));
        }
        let response = match self.response {
            None | Some(serde_json::Value::Null) => {
                return Err(AgentError::Rejected("empty response".to_string()))
            }
            Some(r) => r,
        };

        let payload = match response {
            serde_json::Value::Object(mut map) => match map.remove("result") {
                Some(result) if !result.is_null() => result,
                _ => serde_json::Value::Object(map),
            },
            other => other,
        };

        match payload {
            serde_json::Value::String(text) => {
                let json = extract_json_from_markdown(&text);
                serde_json::from_str(&json).map_err(|e| {
                    AgentError::MalformedPayload(format!("response text is not JSON: {e}"))
                })
            }
            other => Ok(other),
        }
    }

    /// Unwrap and decode into a typed document.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, AgentError> {
        let payload = self.into_payload()?;
        serde_json::from_value(payload).map_err(|e| AgentError::MalformedPayload(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Retries
// ---------------------------------------------------------------------------

/// How often and how patiently to retry a failed agent call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
        }
    }
}

/// Invoke an agent, retrying transient failures with exponential backoff.
///
/// Permanent errors (bad credentials, unknown agent) are returned at once; a
/// rate limit's retry-after hint replaces the backoff delay.
pub async fn invoke_with_retry(
    agent: &dyn ExamAgent,
    request: &AgentRequest,
    policy: &RetryPolicy,
) -> anyhow::Result<AgentEnvelope> {
    let mut delay = policy.initial_delay;
    let mut attempt = 0;
    loop {
        match agent.invoke(request).await {
            Ok(envelope) => return Ok(envelope),
            Err(e) => {
                let classified = e.downcast_ref::<AgentError>();
                if classified.is_some_and(AgentError::is_permanent) || attempt >= policy.max_retries
                {
                    return Err(e);
                }
                if let Some(ms) = classified.and_then(AgentError::retry_after_ms) {
                    delay = Duration::from_millis(ms);
                }
                attempt += 1;
                tracing::warn!(
                    agent = agent.name(),
                    attempt,
                    "agent call failed, retrying in {}ms: {e:#}",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(60));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Markdown JSON extraction
// ---------------------------------------------------------------------------

/// Extract JSON from an agent's text response.
///
/// Handles:
/// - a ```json fenced block (preferred)
/// - a bare ``` fenced block
/// - a truncated, unclosed block
/// - plain text with no fences (returned trimmed)
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_block = None;
    let mut generic_block = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut current = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            current.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_block.get_or_insert_with(|| current.clone());
            } else {
                generic_block.get_or_insert_with(|| current.clone());
            }
            current.clear();
            continue;
        }

        if in_block {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if in_block && !current.is_empty() {
        if is_json_block {
            json_block.get_or_insert(current);
        } else {
            generic_block.get_or_insert(current);
        }
    }

    json_block
        .or(generic_block)
        .unwrap_or_else(|| response.trim().to_string())
}
