//! examforge-agents — backends for the generation and grading agents.
//!
//! Implements the `ExamAgent` trait over HTTP and as an offline mock, and
//! loads the TOML configuration that selects between them.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{create_agent, load_config, load_config_from, AgentConfig, ExamforgeConfig};
pub use http::HttpAgent;
pub use mock::MockAgent;
