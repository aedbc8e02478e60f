//! Planner configuration from TOML (`[agent]` and `[reasoning]` sections)

use atelier_application::PlannerParams;
use atelier_domain::{DEFAULT_MAX_ITERATIONS, Model};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw planner configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// model = "gpt-4.1"
/// max_iterations = 15
/// heartbeat_seconds = 30
/// search_limit = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Reasoning model driving the planner loop
    pub model: String,
    /// Iteration budget before planning is reported incomplete
    pub max_iterations: usize,
    /// Seconds between heartbeat events; 0 disables them
    pub heartbeat_seconds: u64,
    /// Results requested per `web_search` call
    pub search_limit: usize,
    /// Enable the `web_search` planner tool
    pub web_search: bool,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            model: Model::default().to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            heartbeat_seconds: 30,
            search_limit: 5,
            web_search: true,
        }
    }
}

impl FileAgentConfig {
    pub fn to_planner_params(&self) -> PlannerParams {
        PlannerParams::default()
            .with_model(Model::new(self.model.trim()))
            .with_max_iterations(self.max_iterations)
            .with_heartbeat_interval(Duration::from_secs(self.heartbeat_seconds))
            .with_search_limit(self.search_limit)
    }
}

/// OpenAI-compatible chat completions endpoint for the planner.
///
/// ```toml
/// [reasoning]
/// base_url = "https://api.openai.com/v1"
/// api_key_env = "OPENAI_API_KEY"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReasoningConfig {
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for FileReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            max_tokens: 4096,
            temperature: None,
            timeout_seconds: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_to_params() {
        let config = FileAgentConfig {
            model: " claude-sonnet-4 ".to_string(),
            max_iterations: 8,
            heartbeat_seconds: 0,
            ..Default::default()
        };
        let params = config.to_planner_params();
        assert_eq!(params.model.as_str(), "claude-sonnet-4");
        assert_eq!(params.max_iterations, 8);
        assert!(params.heartbeat_interval.is_zero());
    }

    #[test]
    fn test_agent_defaults() {
        let config = FileAgentConfig::default();
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.heartbeat_seconds, 30);
        assert!(config.web_search);
    }
}
