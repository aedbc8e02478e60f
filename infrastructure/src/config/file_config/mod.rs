//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application parameters.

mod agent;
mod output;
mod providers;
mod rate_limits;

pub use agent::{FileAgentConfig, FileReasoningConfig};
pub use output::{FileLoggingConfig, FileOutputConfig, FileOutputFormat, FilePipelineConfig};
pub use providers::{FileProviderConfig, FileProvidersConfig, FileSearchConfig};
pub use rate_limits::{DEFAULT_RATE_LIMIT_KEY, FileRateLimit, FileRateLimitsConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("agent.max_iterations cannot be 0")]
    ZeroIterations,

    #[error("agent.model cannot be empty")]
    EmptyModelName,

    #[error("rate_limits.\"{0}\": max_concurrent must be at least 1")]
    ZeroConcurrency(String),

    #[error("rate_limits.\"{0}\": expected \"provider:tier\" or \"default\"")]
    InvalidRateLimitKey(String),

    #[error("{0}: timeout cannot be 0")]
    ZeroTimeout(String),

    #[error("{0}: base_url cannot be empty")]
    EmptyBaseUrl(String),

    #[error("{0}: name cannot be empty")]
    EmptyProviderName(String),

    #[error("[providers.image] is required to generate assets")]
    MissingImageProvider,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Planner loop settings
    pub agent: FileAgentConfig,
    /// Reasoning model endpoint
    pub reasoning: FileReasoningConfig,
    /// Generation providers per asset kind
    pub providers: FileProvidersConfig,
    /// Web search backend
    pub search: FileSearchConfig,
    /// Per `provider:tier` concurrency and pacing
    pub rate_limits: FileRateLimitsConfig,
    /// Retry budget and optional phases
    pub pipeline: FilePipelineConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Log files and transcripts
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning every problem found.
    ///
    /// A missing image provider is not reported here: it only matters once
    /// a run is started, and `--show-config` must work without one.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.agent.max_iterations == 0 {
            issues.push(ConfigValidationError::ZeroIterations);
        }
        if self.agent.model.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyModelName);
        }

        if self.reasoning.base_url.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyBaseUrl("reasoning".to_string()));
        }
        if self.reasoning.timeout_seconds == 0 {
            issues.push(ConfigValidationError::ZeroTimeout("reasoning".to_string()));
        }

        for (kind, provider) in self.providers.iter() {
            let section = format!("providers.{}", kind);
            if provider.name.trim().is_empty() {
                issues.push(ConfigValidationError::EmptyProviderName(section.clone()));
            }
            if provider.base_url.trim().is_empty() {
                issues.push(ConfigValidationError::EmptyBaseUrl(section.clone()));
            }
            if provider.timeout_ms == 0 || provider.request_timeout_ms == 0 {
                issues.push(ConfigValidationError::ZeroTimeout(section));
            }
        }

        if let Err(e) = self.rate_limits.to_policies() {
            issues.push(e);
        }

        issues
    }
}
