//! Plan entities: [`GenerationPlan`], [`Unit`] and per-asset status.

use super::chart::ChartSpec;
use super::settings::{AspectRatio, GlobalSettings};
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one generated asset belonging to a unit.
///
/// ```text
/// Pending ──> Processing ──> Completed { url }
///    │            │
///    │            └────────> Failed { error } ──(retry)──> Processing
///    └──> Skipped { reason }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AssetStatus {
    #[default]
    Pending,
    Processing,
    Completed {
        url: String,
    },
    Failed {
        error: String,
    },
    Skipped {
        reason: String,
    },
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Processing => "processing",
            AssetStatus::Completed { .. } => "completed",
            AssetStatus::Failed { .. } => "failed",
            AssetStatus::Skipped { .. } => "skipped",
        }
    }

    /// Completed, failed and skipped assets are terminal for the current attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssetStatus::Completed { .. } | AssetStatus::Failed { .. } | AssetStatus::Skipped { .. }
        )
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            AssetStatus::Completed { url } => Some(url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AssetStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Move to `Processing`. Allowed from `Pending` and, for a retry, from `Failed`.
    pub fn start(&mut self) -> Result<(), DomainError> {
        match self {
            AssetStatus::Pending | AssetStatus::Failed { .. } => {
                *self = AssetStatus::Processing;
                Ok(())
            }
            other => Err(DomainError::transition(other.as_str(), "processing")),
        }
    }

    pub fn complete(&mut self, url: impl Into<String>) -> Result<(), DomainError> {
        match self {
            AssetStatus::Processing => {
                *self = AssetStatus::Completed { url: url.into() };
                Ok(())
            }
            other => Err(DomainError::transition(other.as_str(), "completed")),
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        match self {
            AssetStatus::Processing => {
                *self = AssetStatus::Failed {
                    error: error.into(),
                };
                Ok(())
            }
            other => Err(DomainError::transition(other.as_str(), "failed")),
        }
    }

    pub fn skip(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        match self {
            AssetStatus::Pending => {
                *self = AssetStatus::Skipped {
                    reason: reason.into(),
                };
                Ok(())
            }
            other => Err(DomainError::transition(other.as_str(), "skipped")),
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary image configuration of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitImageConfig {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub status: AssetStatus,
}

impl UnitImageConfig {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio,
            status: AssetStatus::Pending,
        }
    }
}

/// A unit as described by the planner's `plan_structure` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDraft {
    #[serde(default)]
    pub title: String,
    pub prompt: String,
    /// Prompt for the primary image; falls back to `prompt` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, alias = "subtitle", skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    /// Units without an image (e.g. a pure text slide) skip asset generation.
    #[serde(default = "default_true")]
    pub needs_image: bool,
}

fn default_true() -> bool {
    true
}

/// One planned sub-artifact (a slide, a scene).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Position in the plan; assembly order follows this index.
    pub index: usize,
    pub title: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<UnitImageConfig>,
    /// Secondary transform of the primary asset (image -> video).
    #[serde(default)]
    pub motion: AssetStatus,
    /// Narration audio synthesized from `narration`.
    #[serde(default)]
    pub narration_audio: AssetStatus,
}

impl Unit {
    pub fn from_draft(index: usize, draft: UnitDraft, aspect_ratio: AspectRatio) -> Self {
        let image = draft.needs_image.then(|| {
            let prompt = draft
                .image_prompt
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| draft.prompt.clone());
            UnitImageConfig::new(prompt, aspect_ratio)
        });
        let title = if draft.title.trim().is_empty() {
            format!("Unit {}", index + 1)
        } else {
            draft.title
        };
        Self {
            index,
            title,
            prompt: draft.prompt,
            layout: draft.layout,
            animation: draft.animation,
            chart: None,
            narration: draft.narration.filter(|n| !n.trim().is_empty()),
            image,
            motion: AssetStatus::Pending,
            narration_audio: AssetStatus::Pending,
        }
    }

    /// Status of the primary asset; units without an image config have none.
    pub fn primary_status(&self) -> Option<&AssetStatus> {
        self.image.as_ref().map(|i| &i.status)
    }

    pub fn primary_url(&self) -> Option<&str> {
        self.primary_status().and_then(AssetStatus::url)
    }

    /// First failure recorded on the visual path (primary asset or motion).
    pub fn failure(&self) -> Option<&str> {
        self.primary_status()
            .and_then(AssetStatus::error)
            .or_else(|| self.motion.error())
    }

    /// Units whose primary asset completed, or that need none, can be assembled.
    pub fn is_assembly_eligible(&self) -> bool {
        match self.primary_status() {
            None => true,
            Some(status) => status.url().is_some(),
        }
    }
}

/// Structured output of the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPlan {
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub settings: GlobalSettings,
    pub units: Vec<Unit>,
    #[serde(default)]
    pub finalized: bool,
}

impl GenerationPlan {
    pub fn new(theme: impl Into<String>, settings: GlobalSettings) -> Self {
        Self {
            theme: theme.into(),
            style: None,
            settings,
            units: Vec::new(),
            finalized: false,
        }
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }

    /// Replace every unit with freshly drafted ones.
    pub fn replace_units(&mut self, drafts: Vec<UnitDraft>) -> Result<(), DomainError> {
        if self.finalized {
            return Err(DomainError::PlanFinalized);
        }
        if drafts.is_empty() {
            return Err(DomainError::InvalidPlan(
                "a plan needs at least one unit".to_string(),
            ));
        }
        if let Some(pos) = drafts.iter().position(|d| d.prompt.trim().is_empty()) {
            return Err(DomainError::InvalidPlan(format!(
                "unit {} has an empty prompt",
                pos + 1
            )));
        }
        let aspect = self.settings.aspect_ratio;
        self.units = drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| Unit::from_draft(i, d, aspect))
            .collect();
        Ok(())
    }

    pub fn attach_chart(&mut self, index: usize, chart: ChartSpec) -> Result<(), DomainError> {
        if self.finalized {
            return Err(DomainError::PlanFinalized);
        }
        let unit = self
            .units
            .get_mut(index)
            .ok_or(DomainError::UnknownUnit(index))?;
        unit.chart = Some(chart);
        Ok(())
    }

    /// Freeze the plan structure. Unit asset statuses remain mutable.
    pub fn finalize(&mut self) -> Result<(), DomainError> {
        if self.units.is_empty() {
            return Err(DomainError::InvalidPlan(
                "cannot finalize a plan without units".to_string(),
            ));
        }
        self.finalized = true;
        Ok(())
    }

    pub fn unit(&self, index: usize) -> Option<&Unit> {
        self.units.get(index)
    }

    pub fn unit_mut(&mut self, index: usize) -> Option<&mut Unit> {
        self.units.get_mut(index)
    }

    /// Short human-readable outline, fed back to the model after planning calls.
    pub fn outline(&self) -> String {
        let mut out = format!(
            "Theme: {} ({} units, {}, {} transitions)",
            self.theme,
            self.units.len(),
            self.settings.aspect_ratio,
            self.settings.transition
        );
        for unit in &self.units {
            out.push_str(&format!("\n{}. {}", unit.index + 1, unit.title));
            if unit.chart.is_some() {
                out.push_str(" [chart]");
            }
            if unit.narration.is_some() {
                out.push_str(" [narration]");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::chart::{ChartType, DataPoint};

    fn draft(prompt: &str) -> UnitDraft {
        UnitDraft {
            title: String::new(),
            prompt: prompt.to_string(),
            image_prompt: None,
            layout: None,
            animation: None,
            narration: None,
            needs_image: true,
        }
    }

    #[test]
    fn test_asset_status_happy_path() {
        let mut status = AssetStatus::Pending;
        status.start().unwrap();
        status.complete("https://cdn/x.png").unwrap();
        assert_eq!(status.url(), Some("https://cdn/x.png"));
        assert!(status.is_terminal());
    }

    #[test]
    fn test_asset_status_retry_after_failure() {
        let mut status = AssetStatus::Pending;
        status.start().unwrap();
        status.fail("boom").unwrap();
        assert_eq!(status.error(), Some("boom"));
        status.start().unwrap();
        assert_eq!(status, AssetStatus::Processing);
    }

    #[test]
    fn test_completed_asset_is_never_resurrected() {
        let mut status = AssetStatus::Processing;
        status.complete("u").unwrap();
        assert!(status.start().is_err());
        assert!(status.fail("late").is_err());
    }

    #[test]
    fn test_skip_only_from_pending() {
        let mut status = AssetStatus::Processing;
        assert!(status.skip("cancelled").is_err());
        let mut pending = AssetStatus::Pending;
        pending.skip("cancelled").unwrap();
        assert_eq!(pending.as_str(), "skipped");
    }

    #[test]
    fn test_replace_units_assigns_indices_and_image_configs() {
        let mut plan = GenerationPlan::new("Ocean", GlobalSettings::default());
        let mut second = draft("a reef");
        second.image_prompt = Some("coral reef, macro".to_string());
        plan.replace_units(vec![draft("a wave"), second]).unwrap();

        assert_eq!(plan.units.len(), 2);
        assert_eq!(plan.units[1].index, 1);
        assert_eq!(plan.units[0].title, "Unit 1");
        let image = plan.units[1].image.as_ref().unwrap();
        assert_eq!(image.prompt, "coral reef, macro");
        assert_eq!(image.status, AssetStatus::Pending);
    }

    #[test]
    fn test_replace_units_rejects_empty_and_blank_prompts() {
        let mut plan = GenerationPlan::new("t", GlobalSettings::default());
        assert!(plan.replace_units(vec![]).is_err());
        assert!(plan.replace_units(vec![draft("ok"), draft("  ")]).is_err());
    }

    #[test]
    fn test_finalized_plan_rejects_structural_changes() {
        let mut plan = GenerationPlan::new("t", GlobalSettings::default());
        plan.replace_units(vec![draft("one")]).unwrap();
        plan.finalize().unwrap();

        assert_eq!(
            plan.replace_units(vec![draft("two")]),
            Err(DomainError::PlanFinalized)
        );
        let chart = ChartSpec::synthesize(
            ChartType::Bar,
            "c",
            &[DataPoint {
                label: "a".to_string(),
                value: 1.0,
                series: None,
            }],
            &[],
        )
        .unwrap();
        assert_eq!(plan.attach_chart(0, chart), Err(DomainError::PlanFinalized));

        // statuses are still updated by the pipeline after finalization
        plan.unit_mut(0).unwrap().motion.start().unwrap();
    }

    #[test]
    fn test_unit_draft_accepts_subtitle_alias() {
        let draft: UnitDraft =
            serde_json::from_value(serde_json::json!({"prompt": "p", "subtitle": "hello"}))
                .unwrap();
        assert_eq!(draft.narration.as_deref(), Some("hello"));
        assert!(draft.needs_image);
    }

    #[test]
    fn test_outline_lists_units() {
        let mut plan = GenerationPlan::new("Ocean", GlobalSettings::default());
        let mut d = draft("wave");
        d.title = "Waves".to_string();
        d.narration = Some("The sea".to_string());
        plan.replace_units(vec![d]).unwrap();
        let outline = plan.outline();
        assert!(outline.contains("1. Waves [narration]"));
    }

    #[test]
    fn test_assembly_eligibility_follows_primary_asset() {
        let mut plan = GenerationPlan::new("t", GlobalSettings::default());
        let mut text_only = draft("title card");
        text_only.needs_image = false;
        plan.replace_units(vec![draft("one"), text_only]).unwrap();

        assert!(!plan.units[0].is_assembly_eligible());
        assert!(plan.units[1].is_assembly_eligible());

        let image = plan.units[0].image.as_mut().unwrap();
        image.status.start().unwrap();
        image.status.complete("https://cdn/one.png").unwrap();
        assert!(plan.units[0].is_assembly_eligible());
    }
}
