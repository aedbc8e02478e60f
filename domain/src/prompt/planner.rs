//! Prompt templates for the planner loop

use crate::run::GenerationRequest;
use crate::tool::kind::{FINALIZE_PROMPT, GENERATE_CHART_DATA, PLAN_STRUCTURE, WEB_SEARCH};

/// Templates for the planner conversation
pub struct PlannerPromptTemplate;

impl PlannerPromptTemplate {
    /// System prompt for the planner model
    pub fn system(max_iterations: usize) -> String {
        format!(
            r#"You are a creative director planning a piece of generated media: an image set, a slide deck or a narrated multi-scene video.

You work by calling tools. Every turn must call at least one tool.

## Workflow

1. Research when the goal needs facts you do not have: call `{WEB_SEARCH}`.
2. Call `{PLAN_STRUCTURE}` with the theme, global settings and an ordered list of units.
   Each unit needs a concrete visual `prompt`. Add `narration` for spoken or subtitle text.
   Calling it again replaces the whole unit list.
3. For units that present numbers, call `{GENERATE_CHART_DATA}` with the 1-based unit index.
4. Call `{FINALIZE_PROMPT}` with a detailed generation brief. This freezes the plan and ends planning.

## Rules

- You have at most {max_iterations} turns. Finalize well before running out.
- If a tool reports an error, fix the arguments and call it again.
- Tool arguments must be valid JSON objects matching the tool schema.
- Prompts describe what is visible: subject, composition, lighting, color, mood."#
        )
    }

    /// First user message: the goal plus any reference material
    pub fn initial_message(request: &GenerationRequest) -> String {
        let mut message = format!("## Goal\n\n{}\n", request.goal.trim());

        if let Some(style) = request.style.as_deref().filter(|s| !s.trim().is_empty()) {
            message.push_str(&format!("\n## Style\n\n{}\n", style.trim()));
        }

        if !request.reference_assets.is_empty() {
            message.push_str("\n## Reference material\n\n");
            for (i, asset) in request.reference_assets.iter().enumerate() {
                match &asset.description {
                    Some(desc) => message.push_str(&format!("{}. {} ({})\n", i + 1, asset.url, desc)),
                    None => message.push_str(&format!("{}. {}\n", i + 1, asset.url)),
                }
            }
        }

        message.push_str(&format!(
            "\nPlan the work, then call `{FINALIZE_PROMPT}`."
        ));
        message
    }

    /// Re-prompt used when a turn produced no tool call
    /// `research` is the digest of collected materials, repeated so the
    /// model can plan from it without searching again.
    pub fn nudge(remaining: usize, has_plan: bool, research: &str) -> String {
        let next = if has_plan {
            format!("If the plan is complete, call `{FINALIZE_PROMPT}` now.")
        } else {
            format!("Call `{PLAN_STRUCTURE}` to lay out the units.")
        };
        let mut text = format!(
            "You did not call a tool. Every turn must call a tool. {} ({} turns left)",
            next, remaining
        );
        if !research.trim().is_empty() {
            text.push_str("\n\nResearch gathered so far:\n");
            text.push_str(research);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::ReferenceAsset;

    #[test]
    fn test_system_prompt_mentions_budget_and_tools() {
        let prompt = PlannerPromptTemplate::system(7);
        assert!(prompt.contains("at most 7 turns"));
        for tool in [PLAN_STRUCTURE, WEB_SEARCH, GENERATE_CHART_DATA, FINALIZE_PROMPT] {
            assert!(prompt.contains(tool), "missing {tool}");
        }
    }

    #[test]
    fn test_initial_message_lists_references() {
        let request = GenerationRequest::new("A short film about lighthouses")
            .with_style("35mm film")
            .with_reference(ReferenceAsset::new("https://x.test/a.jpg").with_description("dusk"))
            .with_reference(ReferenceAsset::new("https://x.test/b.jpg"));
        let message = PlannerPromptTemplate::initial_message(&request);
        assert!(message.contains("## Style\n\n35mm film"));
        assert!(message.contains("1. https://x.test/a.jpg (dusk)"));
        assert!(message.contains("2. https://x.test/b.jpg\n"));
    }

    #[test]
    fn test_nudge_points_at_next_tool() {
        assert!(PlannerPromptTemplate::nudge(3, true, "").contains(FINALIZE_PROMPT));
        assert!(PlannerPromptTemplate::nudge(3, false, "").contains(PLAN_STRUCTURE));
        assert!(!PlannerPromptTemplate::nudge(3, false, " ").contains("Research"));
    }

    #[test]
    fn test_nudge_repeats_research() {
        let nudge = PlannerPromptTemplate::nudge(2, false, "[web_search: tides]\nSpring tides");
        assert!(nudge.ends_with("Research gathered so far:\n[web_search: tides]\nSpring tides"));
    }
}
