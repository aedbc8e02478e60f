//! Execution of planner tool calls against [`AgentState`].
//!
//! Every outcome, including malformed arguments and backend failures,
//! becomes a [`ToolResult`] for the model. Nothing here returns an error to
//! the loop.

use crate::ports::search::{SearchProvider, format_results};
use atelier_domain::core::string::truncate;
use atelier_domain::{
    AgentState, ChartDataArgs, ChartSpec, DomainError, ToolArgumentError, ToolCall, ToolError,
    ToolInvocation, ToolKind, ToolResult,
};
use std::time::Instant;
use tracing::{debug, warn};

pub(crate) struct PlannerTools<'a> {
    search: Option<&'a dyn SearchProvider>,
    search_limit: usize,
}

impl<'a> PlannerTools<'a> {
    pub(crate) fn new(search: Option<&'a dyn SearchProvider>, search_limit: usize) -> Self {
        Self {
            search,
            search_limit,
        }
    }

    pub(crate) async fn execute(&self, state: &mut AgentState, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        let invocation = match ToolInvocation::parse(&call.name, &call.arguments) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!("Rejected tool call {} ({}): {}", call.name, call.id, e);
                state.record_tool(call.name.as_str(), false, &e.to_string());
                return ToolResult::failure(call.name.clone(), argument_error(&e, &call.arguments));
            }
        };
        let tool = invocation.kind().name();
        debug!("Executing {} at iteration {}", tool, state.iteration);

        let result = match invocation {
            ToolInvocation::PlanStructure(args) => match state.apply_structure(args) {
                Ok(plan) => ToolResult::success(tool, format!("Plan updated.\n{}", plan.outline())),
                Err(e) => ToolResult::failure(tool, domain_error(e)),
            },

            ToolInvocation::WebSearch(args) => match self.search {
                None => ToolResult::failure(
                    tool,
                    ToolError::execution_failed("Web search is not available; plan from the goal alone"),
                ),
                Some(search) => match search.search(&args.query, self.search_limit).await {
                    Ok(results) => {
                        let text = format_results(&args.query, &results);
                        state.add_material(format!("web_search: {}", args.query), text.clone());
                        ToolResult::success(tool, text)
                    }
                    Err(e) => {
                        warn!("Search for '{}' failed: {}", args.query, e);
                        ToolResult::failure(tool, ToolError::execution_failed(e.to_string()))
                    }
                },
            },

            ToolInvocation::GenerateChartData(args) => attach_chart(state, args),

            ToolInvocation::FinalizePrompt(args) => match state.finalize(args.prompt) {
                Ok(outcome) if outcome.is_repeat() => ToolResult::success(
                    tool,
                    format!(
                        "The plan was already finalized; the existing brief is kept:\n{}",
                        outcome.brief()
                    ),
                ),
                Ok(_) => {
                    let units = state.plan.as_ref().map(|p| p.units.len()).unwrap_or(0);
                    ToolResult::success(tool, format!("Plan finalized with {} unit(s).", units))
                }
                Err(e) => ToolResult::failure(tool, domain_error(e)),
            },
        };

        let summary = match (&result.output, &result.error) {
            (Some(out), _) => truncate(out, 120),
            (_, Some(err)) => err.to_string(),
            _ => String::new(),
        };
        state.record_tool(tool, result.is_success(), &summary);
        result.with_duration(started.elapsed().as_millis() as u64)
    }
}

fn attach_chart(state: &mut AgentState, args: ChartDataArgs) -> ToolResult {
    let tool = ToolKind::GenerateChartData.name();
    let Some(palette) = state
        .plan
        .as_ref()
        .map(|p| p.settings.color_palette.clone())
    else {
        return ToolResult::failure(
            tool,
            ToolError::precondition_failed("Call plan_structure before adding charts"),
        );
    };
    let index = args.plan_index();
    let chart = match ChartSpec::synthesize(args.chart_type, args.title, &args.data_points, &palette)
    {
        Ok(chart) => chart,
        Err(e) => return ToolResult::failure(tool, domain_error(e)),
    };
    let summary = format!(
        "{} chart \"{}\" attached to unit {} ({} labels, {} series)",
        chart.chart_type,
        chart.title,
        index + 1,
        chart.labels.len(),
        chart.series.len()
    );
    match state.attach_chart(index, chart) {
        Ok(()) => ToolResult::success(tool, summary),
        Err(e) => ToolResult::failure(tool, domain_error(e)),
    }
}

fn argument_error(e: &ToolArgumentError, arguments: &str) -> ToolError {
    match e {
        ToolArgumentError::UnknownTool { .. } => ToolError::not_found(e.to_string()),
        ToolArgumentError::Malformed { .. } => ToolError::invalid_argument(e.to_string())
            .with_details(format!("received: {}", truncate(arguments, 200))),
        ToolArgumentError::Invalid { .. } => ToolError::invalid_argument(e.to_string()),
    }
}

fn domain_error(e: DomainError) -> ToolError {
    match e {
        DomainError::PlanFinalized => ToolError::plan_finalized(),
        DomainError::UnknownUnit(i) => ToolError::not_found(format!("unit {}", i + 1)),
        other => ToolError::invalid_argument(other.to_string()),
    }
}
