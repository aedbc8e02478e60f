//! Infrastructure layer for atelier
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod credentials;
pub mod logging;
pub mod providers;
pub mod search;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig,
    FileOutputConfig, FileOutputFormat, FilePipelineConfig, FileProviderConfig,
    FileProvidersConfig, FileRateLimitsConfig, FileReasoningConfig, FileSearchConfig,
};
pub use credentials::{ApiKeyCache, Clock, CredentialError, DEFAULT_KEY_TTL, KeySource, SystemClock};
pub use logging::JsonlConversationLogger;
pub use providers::generation::{HttpProviderClient, HttpProviderConfig};
pub use providers::openai::{OpenAiCompatConfig, OpenAiCompatGateway};
pub use search::DuckDuckGoSearch;
pub use storage::{JsonFileRunStore, ManifestAssembler};
