//! Configuration file loading for atelier
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables prefixed `ATELIER_` (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./atelier.toml` or `./.atelier.toml`
//! 4. Global: `$XDG_CONFIG_HOME/atelier/config.toml` (or the platform equivalent)
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_RATE_LIMIT_KEY, FileAgentConfig, FileConfig, FileLoggingConfig,
    FileOutputConfig, FileOutputFormat, FilePipelineConfig, FileProviderConfig,
    FileProvidersConfig, FileRateLimit, FileRateLimitsConfig, FileReasoningConfig,
    FileSearchConfig,
};
pub use loader::ConfigLoader;
