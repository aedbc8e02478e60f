//! Final artifact assembly port (Phase 4).

use async_trait::async_trait;
use atelier_domain::{GlobalSettings, ProviderError, RunId};
use serde::{Deserialize, Serialize};

/// One assembled unit, in plan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub unit_index: usize,
    pub title: String,
    /// Still image, if the unit has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Chart configuration serialized as JSON, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<serde_json::Value>,
    /// Set when a secondary asset failed and the segment was degraded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRequest {
    pub run_id: RunId,
    pub theme: String,
    pub brief: String,
    pub settings: GlobalSettings,
    /// Sorted by `unit_index`.
    pub segments: Vec<Segment>,
}

#[async_trait]
pub trait Assembler: Send + Sync {
    /// Compose the final artifact and return its URL.
    async fn assemble(&self, request: &AssemblyRequest) -> Result<String, ProviderError>;
}
