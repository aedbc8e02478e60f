//! Working memory of one planning run.

use super::value_objects::{CollectedMaterial, FinalizeOutcome, Thought, ToolLogEntry};
use crate::core::error::DomainError;
use crate::core::string::truncate;
use crate::plan::chart::ChartSpec;
use crate::plan::entities::{GenerationPlan, UnitDraft};
use crate::plan::settings::GlobalSettings;
use crate::tool::invocation::PlanStructureArgs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Mutable state of the planner loop.
///
/// Owned by a single planning run; no locking is needed. Invariant:
/// `iteration <= max_iterations`, enforced by [`AgentState::begin_iteration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub iteration: usize,
    pub max_iterations: usize,
    pub is_complete: bool,
    #[serde(default)]
    pub collected_materials: Vec<CollectedMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<GenerationPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_brief: Option<String>,
    #[serde(default)]
    pub thoughts: Vec<Thought>,
    #[serde(default)]
    pub tool_log: Vec<ToolLogEntry>,
}

impl AgentState {
    pub fn new(goal: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            goal: goal.into(),
            style: None,
            iteration: 0,
            max_iterations,
            is_complete: false,
            collected_materials: Vec::new(),
            plan: None,
            final_brief: None,
            thoughts: Vec::new(),
            tool_log: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style.filter(|s| !s.trim().is_empty());
        self
    }

    /// Consume one iteration of the budget.
    ///
    /// Returns `false` without changing state when the budget is spent or the
    /// run is already complete.
    pub fn begin_iteration(&mut self) -> bool {
        if self.is_complete || self.iteration >= self.max_iterations {
            return false;
        }
        self.iteration += 1;
        true
    }

    pub fn budget_exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    pub fn remaining_iterations(&self) -> usize {
        self.max_iterations.saturating_sub(self.iteration)
    }

    pub fn add_thought(&mut self, content: impl Into<String>) {
        let content = content.into();
        if content.trim().is_empty() {
            return;
        }
        self.thoughts.push(Thought {
            iteration: self.iteration,
            content,
        });
    }

    pub fn add_material(&mut self, source: impl Into<String>, content: impl Into<String>) {
        self.collected_materials.push(CollectedMaterial {
            source: source.into(),
            content: content.into(),
        });
    }

    /// Concatenated materials, each entry capped at `per_entry` characters.
    pub fn materials_digest(&self, per_entry: usize) -> String {
        self.collected_materials
            .iter()
            .map(|m| format!("[{}]\n{}", m.source, truncate(&m.content, per_entry)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn record_tool(&mut self, tool: impl Into<String>, success: bool, summary: &str) {
        self.tool_log.push(ToolLogEntry {
            iteration: self.iteration,
            tool: tool.into(),
            success,
            summary: truncate(summary, 200),
        });
    }

    /// Create or replace the plan from a `plan_structure` call.
    ///
    /// Settings the model leaves out are kept from the previous plan, so a
    /// follow-up call that only rewrites units does not reset the palette.
    pub fn apply_structure(&mut self, args: PlanStructureArgs) -> Result<&GenerationPlan, DomainError> {
        if self.is_complete {
            return Err(DomainError::PlanFinalized);
        }
        let previous = self.plan.as_ref().map(|p| p.settings.clone()).unwrap_or_default();
        let palette = GlobalSettings::normalized_palette(&args.color_palette);
        let settings = GlobalSettings {
            aspect_ratio: args.aspect_ratio.unwrap_or(previous.aspect_ratio),
            transition: args.transition.unwrap_or(previous.transition),
            color_palette: if palette.is_empty() {
                previous.color_palette
            } else {
                palette
            },
        };
        let style = args
            .style
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.style.clone());

        let mut plan = GenerationPlan::new(args.theme, settings).with_style(style);
        plan.replace_units(args.units)?;

        // Charts survive a restructure when their unit still exists.
        if let Some(old) = self.plan.take() {
            for unit in old.units {
                if let Some(chart) = unit.chart {
                    if unit.index < plan.units.len() {
                        plan.attach_chart(unit.index, chart)?;
                    }
                }
            }
        }

        Ok(&*self.plan.insert(plan))
    }

    pub fn attach_chart(&mut self, index: usize, chart: ChartSpec) -> Result<(), DomainError> {
        if self.is_complete {
            return Err(DomainError::PlanFinalized);
        }
        let plan = self
            .plan
            .as_mut()
            .ok_or_else(|| DomainError::InvalidPlan("no plan has been structured yet".to_string()))?;
        plan.attach_chart(index, chart)
    }

    /// Freeze the plan and record the final brief.
    ///
    /// Without a structured plan the brief itself becomes a single-unit plan.
    /// Idempotent: once finalized, further calls return the first brief and
    /// leave the state untouched.
    pub fn finalize(&mut self, brief: impl Into<String>) -> Result<FinalizeOutcome, DomainError> {
        if self.is_complete {
            let brief = self.final_brief.clone().unwrap_or_default();
            return Ok(FinalizeOutcome::AlreadyFinalized(brief));
        }
        let brief = brief.into();
        if brief.trim().is_empty() {
            return Err(DomainError::InvalidValue {
                field: "prompt",
                value: "empty".to_string(),
            });
        }

        if self.plan.is_none() {
            let mut plan = GenerationPlan::new(truncate(&self.goal, 80), GlobalSettings::default())
                .with_style(self.style.clone());
            plan.replace_units(vec![UnitDraft {
                title: String::new(),
                prompt: brief.clone(),
                image_prompt: None,
                layout: None,
                animation: None,
                narration: None,
                needs_image: true,
            }])?;
            self.plan = Some(plan);
        }
        let plan = self
            .plan
            .as_mut()
            .ok_or_else(|| DomainError::InvalidPlan("no plan to finalize".to_string()))?;
        plan.finalize()?;

        self.final_brief = Some(brief.clone());
        self.is_complete = true;
        Ok(FinalizeOutcome::Finalized(brief))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::chart::{ChartType, DataPoint};
    use crate::plan::settings::{AspectRatio, TransitionStyle};

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

    fn structure(units: &[&str]) -> PlanStructureArgs {
        PlanStructureArgs {
            theme: "Coral reefs".to_string(),
            style: None,
            aspect_ratio: Some(AspectRatio::Portrait),
            transition: None,
            color_palette: vec!["#00aaff".to_string(), "nope".to_string()],
            units: units.iter().map(|u| draft(u)).collect(),
        }
    }

    fn chart() -> ChartSpec {
        ChartSpec::synthesize(
            ChartType::Bar,
            "Reef cover",
            &[DataPoint {
                label: "1990".to_string(),
                value: 40.0,
                series: None,
            }],
            &[],
        )
        .unwrap()
    }

    #[test]
    fn iteration_budget_is_never_exceeded() {
        let mut state = AgentState::new("goal", 2);
        assert!(state.begin_iteration());
        assert!(state.begin_iteration());
        assert!(!state.begin_iteration());
        assert_eq!(state.iteration, 2);
        assert!(state.budget_exhausted());
    }

    #[test]
    fn apply_structure_builds_plan_with_normalized_settings() {
        let mut state = AgentState::new("reefs", 15).with_style(Some("watercolor".into()));
        let plan = state.apply_structure(structure(&["a", "b"])).unwrap();
        assert_eq!(plan.units.len(), 2);
        assert_eq!(plan.settings.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(plan.settings.transition, TransitionStyle::Fade);
        assert_eq!(plan.settings.color_palette, vec!["#00AAFF".to_string()]);
        assert_eq!(plan.style.as_deref(), Some("watercolor"));
    }

    #[test]
    fn restructure_keeps_settings_and_surviving_charts() {
        let mut state = AgentState::new("reefs", 15);
        state.apply_structure(structure(&["a", "b", "c"])).unwrap();
        state.attach_chart(2, chart()).unwrap();
        state.attach_chart(0, chart()).unwrap();

        let mut follow_up = structure(&["x", "y"]);
        follow_up.aspect_ratio = None;
        follow_up.color_palette.clear();
        let plan = state.apply_structure(follow_up).unwrap();

        assert_eq!(plan.settings.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(plan.settings.color_palette, vec!["#00AAFF".to_string()]);
        assert!(plan.units[0].chart.is_some());
        assert!(plan.units[1].chart.is_none());
    }

    #[test]
    fn chart_requires_a_plan() {
        let mut state = AgentState::new("reefs", 15);
        assert!(matches!(
            state.attach_chart(0, chart()),
            Err(DomainError::InvalidPlan(_))
        ));
    }

    #[test]
    fn finalize_without_plan_uses_brief_as_single_unit() {
        let mut state = AgentState::new("A single poster of a reef", 15);
        assert!(state.finalize("   ").is_err());
        assert!(!state.is_complete);

        state.finalize("Poster: coral reef at dawn").unwrap();
        let plan = state.plan.as_ref().unwrap();
        assert!(plan.finalized);
        assert_eq!(plan.units.len(), 1);
        assert_eq!(plan.units[0].prompt, "Poster: coral reef at dawn");
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut state = AgentState::new("reefs", 15);
        state.apply_structure(structure(&["a"])).unwrap();

        let first = state.finalize("first brief").unwrap();
        assert_eq!(first, FinalizeOutcome::Finalized("first brief".into()));
        let snapshot = state.clone();

        let second = state.finalize("something else").unwrap();
        assert!(second.is_repeat());
        assert_eq!(second.brief(), "first brief");
        assert_eq!(state, snapshot);
    }

    #[test]
    fn finalized_plan_rejects_mutation() {
        let mut state = AgentState::new("reefs", 15);
        state.apply_structure(structure(&["a"])).unwrap();
        state.finalize("brief").unwrap();
        assert_eq!(
            state.apply_structure(structure(&["b"])).unwrap_err(),
            DomainError::PlanFinalized
        );
        assert_eq!(state.attach_chart(0, chart()).unwrap_err(), DomainError::PlanFinalized);
    }

    #[test]
    fn materials_digest_truncates_entries() {
        let mut state = AgentState::new("reefs", 15);
        state.add_material("web_search: reefs", "x".repeat(50));
        let digest = state.materials_digest(10);
        assert!(digest.starts_with("[web_search: reefs]\n"));
        assert!(digest.len() < 50);
    }
}
