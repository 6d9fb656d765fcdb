//! Configuration and agent factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examforge_core::generation::ExamBlueprint;
use examforge_core::traits::{ExamAgent, RetryPolicy};

use crate::http::{HttpAgent, DEFAULT_TIMEOUT_SECS};
use crate::mock::MockAgent;

/// Which agent backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Http,
    /// Canned documents from disk; no network.
    Mock,
}

/// The `[agent]` table.
///
/// Note: Custom Debug impl masks the API key.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_generation_agent")]
    pub generation_agent_id: String,
    #[serde(default = "default_grading_agent")]
    pub grading_agent_id: String,
    /// Exam document served by the mock backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_exam: Option<PathBuf>,
    /// Grading result served by the mock backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_result: Option<PathBuf>,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("generation_agent_id", &self.generation_agent_id)
            .field("grading_agent_id", &self.grading_agent_id)
            .field("mock_exam", &self.mock_exam)
            .field("mock_result", &self.mock_result)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_generation_agent() -> String {
    "692f2dfb6b01be7c2f9f5387".to_string()
}
fn default_grading_agent() -> String {
    "692f2e352bb6b2ddb3634ddd".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            generation_agent_id: default_generation_agent(),
            grading_agent_id: default_grading_agent(),
            mock_exam: None,
            mock_result: None,
        }
    }
}

/// Top-level examforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamforgeConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    /// Default exam shape for `generate`.
    #[serde(default)]
    pub blueprint: ExamBlueprint,
    /// Where exam history is kept.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Where graded reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Retries for generation calls. Grading is never retried automatically.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_history_path() -> PathBuf {
    dirs_path()
        .map(|d| d.join("history.json"))
        .unwrap_or_else(|| PathBuf::from("examforge-history.json"))
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./examforge-results")
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    1000
}

impl Default for ExamforgeConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            blueprint: ExamBlueprint::default(),
            history_path: default_history_path(),
            output_dir: default_output_dir(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl ExamforgeConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: std::time::Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examforge.toml` in the current directory
/// 2. `~/.config/examforge/config.toml`
///
/// Environment variable overrides: `EXAMFORGE_API_KEY`, `EXAMFORGE_BASE_URL`.
pub fn load_config() -> Result<ExamforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExamforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamforgeConfig::default(),
    };

    if let Ok(key) = std::env::var("EXAMFORGE_API_KEY") {
        config.agent.api_key = Some(key);
    }
    if let Ok(url) = std::env::var("EXAMFORGE_BASE_URL") {
        config.agent.base_url = url;
    }

    let agent = &mut config.agent;
    agent.base_url = resolve_env_vars(&agent.base_url);
    agent.api_key = agent
        .api_key
        .as_deref()
        .map(resolve_env_vars)
        .filter(|k| !k.is_empty());
    agent.mock_exam = agent.mock_exam.as_deref().map(resolve_path);
    agent.mock_result = agent.mock_result.as_deref().map(resolve_path);
    config.history_path = resolve_path(&config.history_path);
    config.output_dir = resolve_path(&config.output_dir);

    tracing::debug!(
        source = ?config_path,
        backend = ?config.agent.backend,
        "configuration loaded"
    );
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examforge"))
}

/// Create an agent from its configuration.
pub fn create_agent(config: &AgentConfig) -> Result<Box<dyn ExamAgent>> {
    match config.backend {
        Backend::Http => Ok(Box::new(HttpAgent::new(
            &config.base_url,
            config.api_key.clone(),
            config.timeout_secs,
        )?)),
        Backend::Mock => Ok(Box::new(MockAgent::from_files(
            &config.generation_agent_id,
            config.mock_exam.as_deref(),
            &config.grading_agent_id,
            config.mock_result.as_deref(),
        )?)),
    }
}

/// Sample configuration written by `examforge init`.
pub const SAMPLE_CONFIG: &str = r#"# examforge configuration

# history_path = "~/.config/examforge/history.json"
output_dir = "./examforge-results"
max_retries = 2
retry_delay_ms = 1000

[agent]
backend = "http"
base_url = "http://localhost:3000"
api_key = "${EXAMFORGE_API_KEY}"
timeout_secs = 120
generation_agent_id = "692f2dfb6b01be7c2f9f5387"
grading_agent_id = "692f2e352bb6b2ddb3634ddd"

# Offline mode: serve canned documents instead of calling the service.
# backend = "mock"
# mock_exam = "exams/sample.json"
# mock_result = "exams/sample-result.json"

[blueprint]
mcq_count = 10
fill_blank_count = 5
short_answer_count = 3
difficulty = "Mixed"
"#;
