//! Persisted run state.

use super::request::{GenerationRequest, RunId};
use crate::event::PipelinePhase;
use crate::plan::entities::{AssetStatus, GenerationPlan, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Furthest point a run has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Submitted,
    Planning,
    AssetGeneration,
    Transform,
    Assembly,
    Completed,
    Failed,
    Cancelled,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Submitted => "submitted",
            RunPhase::Planning => "planning",
            RunPhase::AssetGeneration => "asset_generation",
            RunPhase::Transform => "transform",
            RunPhase::Assembly => "assembly",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
            RunPhase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Failed | RunPhase::Cancelled
        )
    }
}

impl From<PipelinePhase> for RunPhase {
    fn from(phase: PipelinePhase) -> Self {
        match phase {
            PipelinePhase::Planning => RunPhase::Planning,
            PipelinePhase::AssetGeneration => RunPhase::AssetGeneration,
            PipelinePhase::Transform => RunPhase::Transform,
            PipelinePhase::Assembly => RunPhase::Assembly,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOutcome {
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

/// Durable per-unit summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub index: usize,
    pub title: String,
    pub status: UnitOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitRecord {
    pub fn from_unit(unit: &Unit) -> Self {
        let status = match unit.primary_status() {
            None => UnitOutcome::Succeeded,
            Some(AssetStatus::Completed { .. }) => UnitOutcome::Succeeded,
            Some(AssetStatus::Failed { .. }) => UnitOutcome::Failed,
            Some(AssetStatus::Skipped { .. }) => UnitOutcome::Skipped,
            Some(AssetStatus::Pending | AssetStatus::Processing) => UnitOutcome::Pending,
        };
        let error = unit
            .failure()
            .or_else(|| unit.narration_audio.error())
            .map(str::to_string)
            .or_else(|| match unit.primary_status() {
                Some(AssetStatus::Skipped { reason }) => Some(reason.clone()),
                _ => None,
            });
        Self {
            index: unit.index,
            title: unit.title.clone(),
            status,
            asset_url: unit.primary_url().map(str::to_string),
            video_url: unit.motion.url().map(str::to_string),
            audio_url: unit.narration_audio.url().map(str::to_string),
            error,
        }
    }
}

/// Everything needed to report on a run after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub request: GenerationRequest,
    pub phase: RunPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<GenerationPlan>,
    #[serde(default)]
    pub units: Vec<UnitRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_brief: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunSnapshot {
    pub fn new(run_id: RunId, request: GenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            request,
            phase: RunPhase::Submitted,
            plan: None,
            units: Vec::new(),
            final_brief: None,
            artifact_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh the plan copy and unit records, and move to `phase`.
    pub fn record(&mut self, phase: RunPhase, plan: Option<&GenerationPlan>) {
        self.phase = phase;
        if let Some(plan) = plan {
            self.units = plan.units.iter().map(UnitRecord::from_unit).collect();
            self.plan = Some(plan.clone());
        }
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.phase = RunPhase::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn succeeded_units(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units
            .iter()
            .filter(|u| u.status == UnitOutcome::Succeeded)
    }
}
