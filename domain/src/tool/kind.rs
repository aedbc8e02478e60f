//! The closed set of planner tools.

use super::entities::{ToolDefinition, ToolParameter};
use std::fmt;

pub const PLAN_STRUCTURE: &str = "plan_structure";
pub const WEB_SEARCH: &str = "web_search";
pub const GENERATE_CHART_DATA: &str = "generate_chart_data";
pub const FINALIZE_PROMPT: &str = "finalize_prompt";

/// Tools the planner's model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Emit or replace the plan's units.
    PlanStructure,
    /// Query the search provider and collect the results as research notes.
    WebSearch,
    /// Synthesize a chart configuration for one unit.
    GenerateChartData,
    /// Freeze the plan and produce the final generation brief. Terminal.
    FinalizePrompt,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::PlanStructure,
        ToolKind::WebSearch,
        ToolKind::GenerateChartData,
        ToolKind::FinalizePrompt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::PlanStructure => PLAN_STRUCTURE,
            ToolKind::WebSearch => WEB_SEARCH,
            ToolKind::GenerateChartData => GENERATE_CHART_DATA,
            ToolKind::FinalizePrompt => FINALIZE_PROMPT,
        }
    }

    /// Resolve a tool name emitted by the model, accepting common aliases.
    pub fn resolve(name: &str) -> Option<ToolKind> {
        let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            PLAN_STRUCTURE | "plan" | "create_plan" | "structure" => Some(ToolKind::PlanStructure),
            WEB_SEARCH | "search" | "web" => Some(ToolKind::WebSearch),
            GENERATE_CHART_DATA | "chart" | "generate_chart" | "chart_data" => {
                Some(ToolKind::GenerateChartData)
            }
            FINALIZE_PROMPT | "finalize" | "finalise_prompt" | "final_prompt" => {
                Some(ToolKind::FinalizePrompt)
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolKind::FinalizePrompt)
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolKind::PlanStructure => ToolDefinition::new(
                PLAN_STRUCTURE,
                "Create or replace the plan: a theme, global settings and the ordered list of \
                 units (slides or scenes). Calling it again replaces every unit.",
            )
            .with_parameter(ToolParameter::new("theme", "Overall theme of the work", true))
            .with_parameter(ToolParameter::new("style", "Visual style keywords", false))
            .with_parameter(ToolParameter::new(
                "aspect_ratio",
                "One of 16:9, 9:16, 1:1, 4:3",
                false,
            ))
            .with_parameter(ToolParameter::new(
                "transition",
                "One of cut, fade, dissolve, slide, zoom",
                false,
            ))
            .with_parameter(
                ToolParameter::new("color_palette", "Hex colors like #1A2B3C", false)
                    .with_schema(serde_json::json!({
                        "type": "array",
                        "items": { "type": "string" }
                    })),
            )
            .with_parameter(
                ToolParameter::new("units", "Ordered units of the plan", true).with_schema(
                    serde_json::json!({
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "prompt": { "type": "string", "description": "What this unit shows" },
                                "image_prompt": { "type": "string", "description": "Detailed prompt for the image provider" },
                                "layout": { "type": "string" },
                                "animation": { "type": "string" },
                                "narration": { "type": "string", "description": "Voice-over or subtitle text" },
                                "needs_image": { "type": "boolean" }
                            },
                            "required": ["prompt"]
                        }
                    }),
                ),
            ),
            ToolKind::WebSearch => ToolDefinition::new(
                WEB_SEARCH,
                "Search the web for facts, figures or references. Results are kept as research \
                 notes for the rest of the planning session.",
            )
            .with_parameter(ToolParameter::new("query", "The search query", true)),
            ToolKind::GenerateChartData => ToolDefinition::new(
                GENERATE_CHART_DATA,
                "Attach a chart to one unit, built from the described data points.",
            )
            .with_parameter(
                ToolParameter::new("unit_index", "1-based position of the unit", true)
                    .with_type("integer"),
            )
            .with_parameter(ToolParameter::new(
                "chart_type",
                "One of bar, line, pie, area",
                true,
            ))
            .with_parameter(ToolParameter::new("title", "Chart title", true))
            .with_parameter(
                ToolParameter::new("data_points", "Data points", true).with_schema(
                    serde_json::json!({
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "label": { "type": "string" },
                                "value": { "type": "number" },
                                "series": { "type": "string" }
                            },
                            "required": ["label", "value"]
                        }
                    }),
                ),
            ),
            ToolKind::FinalizePrompt => ToolDefinition::new(
                FINALIZE_PROMPT,
                "Freeze the plan and provide the final, detailed generation brief. Call this \
                 exactly once, when the plan is complete.",
            )
            .with_parameter(ToolParameter::new(
                "prompt",
                "The final natural-language generation brief",
                true,
            )),
        }
    }

    /// Every tool definition in API form, in a stable order.
    pub fn api_tools() -> Vec<serde_json::Value> {
        Self::ALL.iter().map(|k| k.definition().to_api_tool()).collect()
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_canonical_and_aliases() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::resolve(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::resolve("Finalize"), Some(ToolKind::FinalizePrompt));
        assert_eq!(ToolKind::resolve("web-search"), Some(ToolKind::WebSearch));
        assert_eq!(ToolKind::resolve("read_file"), None);
    }

    #[test]
    fn test_only_finalize_is_terminal() {
        let terminal: Vec<_> = ToolKind::ALL.iter().filter(|k| k.is_terminal()).collect();
        assert_eq!(terminal, vec![&ToolKind::FinalizePrompt]);
    }

    #[test]
    fn test_api_tools_cover_every_kind() {
        let tools = ToolKind::api_tools();
        assert_eq!(tools.len(), 4);
        let names: Vec<&str> = tools
            .iter()
            .filter_map(|t| t["function"]["name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec![PLAN_STRUCTURE, WEB_SEARCH, GENERATE_CHART_DATA, FINALIZE_PROMPT]
        );
    }
}
