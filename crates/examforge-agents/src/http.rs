//! Agent backend speaking the `/api/agent` HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use examforge_core::error::AgentError;
use examforge_core::traits::{AgentEnvelope, AgentRequest, ExamAgent};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Calls `POST {base_url}/api/agent` with `{ message, agent_id }`.
pub struct HttpAgent {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAgent")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HttpAgent {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, AgentError> {
        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AgentError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ExamAgent for HttpAgent {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(agent_id = %request.agent_id))]
    async fn invoke(&self, request: &AgentRequest) -> anyhow::Result<AgentEnvelope> {
        let mut req = self
            .client
            .post(format!("{}/api/agent", self.base_url))
            .header("content-type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.json(request).send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AgentError::NetworkError(format!(
                    "agent service not reachable at {}",
                    self.base_url
                ))
            } else {
                AgentError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                .saturating_mul(1000);
            return Err(AgentError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(AgentError::AgentNotFound(request.agent_id.clone()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let envelope: AgentEnvelope =
            response.json().await.map_err(|e| AgentError::ApiError {
                status,
                message: format!("failed to parse response: {e}"),
            })?;
        tracing::debug!(success = envelope.success, "agent responded");
        Ok(envelope)
    }
}
