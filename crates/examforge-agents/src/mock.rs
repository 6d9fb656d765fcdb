//! Offline agent for tests and demos.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;

use examforge_core::error::AgentError;
use examforge_core::traits::{AgentEnvelope, AgentRequest, ExamAgent};

/// Replies with a canned document per agent id.
///
/// Queued failures are returned first, one per call.
pub struct MockAgent {
    /// Agent id → document returned as `response.result`.
    responses: HashMap<String, serde_json::Value>,
    failures: Mutex<VecDeque<AgentError>>,
    call_count: AtomicU32,
    last_request: Mutex<Option<AgentRequest>>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failures: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Answer calls to `agent_id` with `document`.
    pub fn with_response(mut self, agent_id: &str, document: serde_json::Value) -> Self {
        self.responses.insert(agent_id.to_string(), document);
        self
    }

    /// Load canned generation and grading documents from JSON files.
    pub fn from_files(
        generation_agent_id: &str,
        exam_path: Option<&Path>,
        grading_agent_id: &str,
        result_path: Option<&Path>,
    ) -> Result<Self> {
        let mut agent = Self::new();
        if let Some(path) = exam_path {
            agent = agent.with_response(generation_agent_id, read_json(path)?);
        }
        if let Some(path) = result_path {
            agent = agent.with_response(grading_agent_id, read_json(path)?);
        }
        Ok(agent)
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: AgentError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<AgentRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read mock document: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse mock document: {}", path.display()))
}

#[async_trait]
impl ExamAgent for MockAgent {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, request: &AgentRequest) -> anyhow::Result<AgentEnvelope> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let queued = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        if let Some(error) = queued {
            return Err(error.into());
        }

        match self.responses.get(&request.agent_id) {
            Some(document) => Ok(AgentEnvelope::ok(
                serde_json::json!({ "result": document }),
            )),
            None => Err(AgentError::AgentNotFound(request.agent_id.clone()).into()),
        }
    }
}
