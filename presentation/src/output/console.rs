//! Console output for finished runs

use atelier_application::{PipelineError, PipelineReport};
use colored::Colorize;

/// Formats run results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Human-readable summary of a finished run
    pub fn format(report: &PipelineReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&report.plan.theme));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Run:".cyan().bold(), report.run_id));
        if !report.brief.is_empty() {
            output.push_str(&format!("{} {}\n", "Brief:".cyan().bold(), report.brief));
        }

        output.push_str(&Self::section_header("Units"));
        for unit in &report.plan.units {
            let number = format!("{:>2}.", unit.index + 1);
            if report.succeeded.contains(&unit.index) {
                output.push_str(&format!("{} {} {}\n", "✓".green(), number, unit.title));
            } else {
                let reason = report
                    .failed
                    .iter()
                    .find(|f| f.unit_index == unit.index)
                    .map(|f| format!("{} failed: {}", f.stage, f.error))
                    .unwrap_or_else(|| "not assembled".to_string());
                output.push_str(&format!(
                    "{} {} {} {}\n",
                    "✗".red(),
                    number,
                    unit.title,
                    format!("({})", reason).dimmed()
                ));
            }
        }

        if !report.warnings.is_empty() {
            output.push_str(&Self::section_header("Warnings"));
            for warning in &report.warnings {
                output.push_str(&format!(
                    "  * unit {} {}: {}\n",
                    warning.unit_index + 1,
                    warning.stage,
                    warning.error
                ));
            }
        }

        output.push('\n');
        match (&report.artifact_url, &report.assembly_error) {
            (Some(url), _) => {
                output.push_str(&format!("{} {}\n", "Artifact:".green().bold(), url));
            }
            (None, Some(error)) => {
                output.push_str(&format!("{} {}\n", "Assembly failed:".red().bold(), error));
            }
            (None, None) => {}
        }

        output.push_str(&Self::footer());
        output
    }

    /// The full report as pretty JSON
    pub fn format_json(report: &PipelineReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    /// Explain a failed run, including how far planning got.
    pub fn format_error(error: &PipelineError) -> String {
        let mut output = format!("{} {}\n", "Run failed:".red().bold(), error);
        if let PipelineError::Planning(planner) = error {
            output.push_str(&format!("  {}\n", planner));
            if let Some(state) = planner.state() {
                output.push_str(&format!(
                    "  {} {}/{} iterations, {} tool calls, {} materials collected\n",
                    "Planner:".dimmed(),
                    state.iteration,
                    state.max_iterations,
                    state.tool_log.len(),
                    state.collected_materials.len()
                ));
            }
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_application::PlannerError;
    use atelier_domain::{
        AgentState, AssetStage, GenerationPlan, GlobalSettings, RunId, UnitDraft, UnitFailure,
    };

    fn report() -> PipelineReport {
        let mut plan = GenerationPlan::new("How tides work", GlobalSettings::default());
        let drafts = ["The moon", "Gravity", "Spring tides"]
            .iter()
            .map(|title| UnitDraft {
                title: title.to_string(),
                prompt: format!("{} illustration", title),
                image_prompt: None,
                layout: None,
                animation: None,
                narration: None,
                needs_image: true,
            })
            .collect();
        plan.replace_units(drafts).unwrap();

        PipelineReport {
            run_id: RunId::generate(),
            artifact_url: Some("file:///tmp/out/manifest.json".to_string()),
            succeeded: vec![0, 2],
            failed: vec![UnitFailure {
                unit_index: 1,
                stage: AssetStage::Image,
                error: "content filter".to_string(),
            }],
            warnings: vec![UnitFailure {
                unit_index: 2,
                stage: AssetStage::Narration,
                error: "voice unavailable".to_string(),
            }],
            assembly_error: None,
            plan,
            brief: "Three slides on tides".to_string(),
        }
    }

    #[test]
    fn test_format_lists_units_and_artifact() {
        let text = ConsoleFormatter::format(&report());
        assert!(text.contains("The moon"));
        assert!(text.contains("image failed: content filter"));
        assert!(text.contains("unit 3 narration: voice unavailable"));
        assert!(text.contains("file:///tmp/out/manifest.json"));
    }

    #[test]
    fn test_format_json_is_parseable() {
        let json = ConsoleFormatter::format_json(&report());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["succeeded"], serde_json::json!([0, 2]));
        assert_eq!(value["failed"][0]["stage"], "image");
        assert_eq!(value["plan"]["units"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_format_error() {
        let text = ConsoleFormatter::format_error(&PipelineError::NoUsableUnits { failed: 4 });
        assert!(text.contains("No unit produced a usable asset (4 failed)"));

        let mut state = AgentState::new("tides", 3);
        state.iteration = 3;
        let text = ConsoleFormatter::format_error(&PipelineError::Planning(
            PlannerError::PlanningIncomplete {
                state: Box::new(state),
            },
        ));
        assert!(text.contains("3/3 iterations"));
    }
}
