//! Pipeline parameters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Extra attempts for a failed per-unit job (transient or job failure).
    pub unit_retries: u32,
    /// Run Phase 3 (image -> video) when a video provider is available.
    pub transform: bool,
    /// Synthesize narration audio when a speech provider is available.
    pub narration: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            unit_retries: 1,
            transform: true,
            narration: true,
        }
    }
}

impl PipelineParams {
    pub fn with_unit_retries(mut self, retries: u32) -> Self {
        self.unit_retries = retries;
        self
    }

    pub fn with_transform(mut self, enabled: bool) -> Self {
        self.transform = enabled;
        self
    }

    pub fn with_narration(mut self, enabled: bool) -> Self {
        self.narration = enabled;
        self
    }

    /// Total attempts per unit job.
    pub fn max_attempts(&self) -> u32 {
        self.unit_retries.saturating_add(1)
    }
}
