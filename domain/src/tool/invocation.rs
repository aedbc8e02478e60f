//! Typed tool invocations parsed from raw model tool calls.

use super::json_repair::{self, RepairTier};
use super::kind::ToolKind;
use crate::plan::chart::{ChartType, DataPoint};
use crate::plan::entities::UnitDraft;
use crate::plan::settings::{AspectRatio, TransitionStyle};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A tool call the planner cannot execute as given.
///
/// Never surfaced to the end user: the planner turns it into a failed tool
/// result so the model can correct itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolArgumentError {
    #[error("Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    #[error("Arguments for {tool} are malformed, retry with valid JSON: {reason}")]
    Malformed { tool: &'static str, reason: String },

    #[error("Invalid argument for {tool}: {reason}")]
    Invalid { tool: &'static str, reason: String },
}

impl ToolArgumentError {
    fn invalid(kind: ToolKind, reason: impl Into<String>) -> Self {
        ToolArgumentError::Invalid {
            tool: kind.name(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanStructureArgs {
    pub theme: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub transition: Option<TransitionStyle>,
    #[serde(default)]
    pub color_palette: Vec<String>,
    #[serde(alias = "slides", alias = "scenes")]
    pub units: Vec<UnitDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartDataArgs {
    /// 1-based unit position, as presented to the model.
    pub unit_index: usize,
    pub chart_type: ChartType,
    #[serde(default)]
    pub title: String,
    pub data_points: Vec<DataPoint>,
}

impl ChartDataArgs {
    /// 0-based plan index.
    pub fn plan_index(&self) -> usize {
        self.unit_index.saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FinalizeArgs {
    #[serde(alias = "brief", alias = "final_prompt")]
    pub prompt: String,
}

/// A validated, typed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    PlanStructure(PlanStructureArgs),
    WebSearch(WebSearchArgs),
    GenerateChartData(ChartDataArgs),
    FinalizePrompt(FinalizeArgs),
}

impl ToolInvocation {
    /// Resolve the tool name and parse its raw JSON arguments.
    pub fn parse(name: &str, raw_arguments: &str) -> Result<Self, ToolArgumentError> {
        let kind = ToolKind::resolve(name).ok_or_else(|| ToolArgumentError::UnknownTool {
            name: name.to_string(),
            available: ToolKind::ALL
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(", "),
        })?;

        let repaired = json_repair::repair(raw_arguments);
        let invocation = match kind {
            ToolKind::PlanStructure => {
                let args: PlanStructureArgs = decode(kind, repaired.value, repaired.tier)?;
                if args.theme.trim().is_empty() {
                    return Err(ToolArgumentError::invalid(kind, "theme must not be empty"));
                }
                if args.units.is_empty() {
                    return Err(ToolArgumentError::invalid(
                        kind,
                        "units must contain at least one unit",
                    ));
                }
                ToolInvocation::PlanStructure(args)
            }
            ToolKind::WebSearch => {
                let args: WebSearchArgs = decode(kind, repaired.value, repaired.tier)?;
                if args.query.trim().is_empty() {
                    return Err(ToolArgumentError::invalid(kind, "query must not be empty"));
                }
                ToolInvocation::WebSearch(args)
            }
            ToolKind::GenerateChartData => {
                let args: ChartDataArgs = decode(kind, repaired.value, repaired.tier)?;
                if args.unit_index == 0 {
                    return Err(ToolArgumentError::invalid(
                        kind,
                        "unit_index is 1-based and must be at least 1",
                    ));
                }
                ToolInvocation::GenerateChartData(args)
            }
            ToolKind::FinalizePrompt => {
                let args: FinalizeArgs = decode(kind, repaired.value, repaired.tier)?;
                if args.prompt.trim().is_empty() {
                    return Err(ToolArgumentError::invalid(kind, "prompt must not be empty"));
                }
                ToolInvocation::FinalizePrompt(args)
            }
        };
        Ok(invocation)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInvocation::PlanStructure(_) => ToolKind::PlanStructure,
            ToolInvocation::WebSearch(_) => ToolKind::WebSearch,
            ToolInvocation::GenerateChartData(_) => ToolKind::GenerateChartData,
            ToolInvocation::FinalizePrompt(_) => ToolKind::FinalizePrompt,
        }
    }
}

fn decode<T: DeserializeOwned>(
    kind: ToolKind,
    value: serde_json::Value,
    tier: RepairTier,
) -> Result<T, ToolArgumentError> {
    serde_json::from_value(value).map_err(|e| {
        let reason = match tier {
            RepairTier::EmptyFallback => format!("arguments were not valid JSON ({})", e),
            _ => e.to_string(),
        };
        ToolArgumentError::Malformed {
            tool: kind.name(),
            reason,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plan_structure_with_aliases() {
        let raw = r#"{
            "theme": "Deep sea",
            "aspect_ratio": "9:16",
            "transition": "dissolve",
            "scenes": [{"title": "Abyss", "prompt": "dark water", "subtitle": "Down we go"}]
        }"#;
        let ToolInvocation::PlanStructure(args) = ToolInvocation::parse("plan_structure", raw)
            .unwrap()
        else {
            panic!("expected plan_structure");
        };
        assert_eq!(args.aspect_ratio, Some(AspectRatio::Portrait));
        assert_eq!(args.transition, Some(TransitionStyle::Dissolve));
        assert_eq!(args.units[0].narration.as_deref(), Some("Down we go"));
    }

    #[test]
    fn unknown_tool_lists_available_tools() {
        let err = ToolInvocation::parse("render_video", "{}").unwrap_err();
        match err {
            ToolArgumentError::UnknownTool { name, available } => {
                assert_eq!(name, "render_video");
                assert!(available.contains("finalize_prompt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_arguments_are_malformed() {
        let err = ToolInvocation::parse("plan_structure", "<<not json>>").unwrap_err();
        assert!(matches!(
            err,
            ToolArgumentError::Malformed {
                tool: "plan_structure",
                ..
            }
        ));
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn repaired_arguments_are_accepted() {
        let invocation =
            ToolInvocation::parse("finalize_prompt", r#"{"prompt": "A calm ocean film"#).unwrap();
        assert_eq!(invocation.kind(), ToolKind::FinalizePrompt);
    }

    #[test]
    fn semantic_validation_errors() {
        assert!(matches!(
            ToolInvocation::parse("web_search", r#"{"query": "   "}"#),
            Err(ToolArgumentError::Invalid { .. })
        ));
        assert!(matches!(
            ToolInvocation::parse(
                "generate_chart_data",
                r#"{"unit_index": 0, "chart_type": "bar", "data_points": [{"label": "a", "value": 1}]}"#
            ),
            Err(ToolArgumentError::Invalid { .. })
        ));
        assert!(matches!(
            ToolInvocation::parse("plan_structure", r#"{"theme": "t", "units": []}"#),
            Err(ToolArgumentError::Invalid { .. })
        ));
    }

    #[test]
    fn chart_args_convert_to_plan_index() {
        let ToolInvocation::GenerateChartData(args) = ToolInvocation::parse(
            "chart",
            r#"{"unit_index": 3, "chart_type": "pie", "title": "Share", "data_points": [{"label": "a", "value": 1}]}"#,
        )
        .unwrap() else {
            panic!("expected chart");
        };
        assert_eq!(args.plan_index(), 2);
        assert_eq!(args.chart_type, ChartType::Pie);
    }
}
