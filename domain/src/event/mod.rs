//! Progress events streamed from a run to its consumer.
//!
//! Events are plain data. The pipeline writes them into a channel and the
//! transport layer decides how to frame them; serialized form is a JSON
//! object tagged by `type` in snake case (`unit_asset_progress`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed phases of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Planning,
    AssetGeneration,
    Transform,
    Assembly,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Planning => "planning",
            PipelinePhase::AssetGeneration => "asset_generation",
            PipelinePhase::Transform => "transform",
            PipelinePhase::Assembly => "assembly",
        }
    }

    /// 1-based position in the pipeline.
    pub fn number(&self) -> u8 {
        match self {
            PipelinePhase::Planning => 1,
            PipelinePhase::AssetGeneration => 2,
            PipelinePhase::Transform => 3,
            PipelinePhase::Assembly => 4,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which per-unit asset an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStage {
    Image,
    Narration,
    Motion,
}

impl AssetStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStage::Image => "image",
            AssetStage::Narration => "narration",
            AssetStage::Motion => "motion",
        }
    }
}

impl fmt::Display for AssetStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-unit failure reported in the `complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub unit_index: usize,
    pub stage: AssetStage,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunSubmitted {
        run_id: String,
    },
    Start {
        run_id: String,
        goal: String,
    },
    Phase {
        name: PipelinePhase,
    },
    /// Streamed reasoning text. Advisory: dropped under backpressure.
    Thought {
        text: String,
    },
    Action {
        tool: String,
        input: serde_json::Value,
    },
    Observation {
        tool: String,
        success: bool,
        result: String,
    },
    Heartbeat {
        iteration: usize,
        elapsed_secs: u64,
    },
    UnitAssetStart {
        unit_index: usize,
        stage: AssetStage,
        attempt: u32,
    },
    UnitAssetProgress {
        unit_index: usize,
        stage: AssetStage,
        progress: u8,
    },
    UnitAssetComplete {
        unit_index: usize,
        stage: AssetStage,
        url: String,
    },
    UnitAssetError {
        unit_index: usize,
        stage: AssetStage,
        error: String,
        will_retry: bool,
    },
    PromptReady {
        prompt: String,
        units: usize,
    },
    /// Emitted on success, including partial success.
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact_url: Option<String>,
        /// Plan indices of assembled units, ascending.
        succeeded: Vec<usize>,
        /// Units left out of the artifact.
        failed: Vec<UnitFailure>,
        /// Failures that did not exclude the unit (narration, motion).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<UnitFailure>,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    /// Wire name of the event (`type` tag).
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::RunSubmitted { .. } => "run_submitted",
            ProgressEvent::Start { .. } => "start",
            ProgressEvent::Phase { .. } => "phase",
            ProgressEvent::Thought { .. } => "thought",
            ProgressEvent::Action { .. } => "action",
            ProgressEvent::Observation { .. } => "observation",
            ProgressEvent::Heartbeat { .. } => "heartbeat",
            ProgressEvent::UnitAssetStart { .. } => "unit_asset_start",
            ProgressEvent::UnitAssetProgress { .. } => "unit_asset_progress",
            ProgressEvent::UnitAssetComplete { .. } => "unit_asset_complete",
            ProgressEvent::UnitAssetError { .. } => "unit_asset_error",
            ProgressEvent::PromptReady { .. } => "prompt_ready",
            ProgressEvent::Complete { .. } => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// `complete` and `error` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. }
        )
    }

    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Thought { .. } | ProgressEvent::UnitAssetProgress { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_type_tag() {
        let event = ProgressEvent::UnitAssetProgress {
            unit_index: 2,
            stage: AssetStage::Motion,
            progress: 40,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "unit_asset_progress");
        assert_eq!(json["stage"], "motion");
        assert_eq!(json["type"], event.kind());
    }

    #[test]
    fn complete_omits_empty_warnings() {
        let event = ProgressEvent::Complete {
            artifact_url: Some("file:///tmp/a.json".into()),
            succeeded: vec![0, 1],
            failed: vec![],
            warnings: vec![],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("warnings"));
        let back: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert!(back.is_terminal());
    }

    #[test]
    fn only_thoughts_are_advisory() {
        assert!(ProgressEvent::Thought { text: "hm".into() }.is_advisory());
        assert!(!ProgressEvent::Phase {
            name: PipelinePhase::Assembly
        }
        .is_advisory());
        assert_eq!(PipelinePhase::Transform.number(), 3);
    }
}
