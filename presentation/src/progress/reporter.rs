//! Renders the progress event stream of a run
//!
//! The run's event channel is drained by [`drain_events`], which hands every
//! event to a [`ProgressRenderer`] and returns the terminal event.

use atelier_domain::{AssetStage, PipelinePhase, ProgressEvent};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Something that displays progress events.
pub trait ProgressRenderer: Send + Sync {
    fn render(&self, event: &ProgressEvent);

    /// Called once the channel closes.
    fn finish(&self) {}
}

/// Drain `events` until the run drops its sender.
///
/// Returns the terminal event (`complete` or `error`), if one arrived.
pub async fn drain_events(
    mut events: mpsc::Receiver<ProgressEvent>,
    renderer: &dyn ProgressRenderer,
) -> Option<ProgressEvent> {
    let mut terminal = None;
    while let Some(event) = events.recv().await {
        renderer.render(&event);
        if event.is_terminal() {
            terminal = Some(event);
        }
    }
    renderer.finish();
    terminal
}

fn phase_name(phase: &PipelinePhase) -> &'static str {
    match phase {
        PipelinePhase::Planning => "Planning",
        PipelinePhase::AssetGeneration => "Generating assets",
        PipelinePhase::Transform => "Animating",
        PipelinePhase::Assembly => "Assembling",
    }
}

fn stage_name(stage: &AssetStage) -> &'static str {
    match stage {
        AssetStage::Image => "image",
        AssetStage::Narration => "narration",
        AssetStage::Motion => "motion",
    }
}

fn truncate(s: &str, max: usize) -> String {
    let single_line = s.replace('\n', " ");
    if single_line.chars().count() <= max {
        single_line
    } else {
        let cut: String = single_line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// One plain-text line per event worth printing on its own.
///
/// Thoughts, heartbeats and in-flight progress return `None`: they only
/// update the live status line.
pub fn describe(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::RunSubmitted { run_id } => Some(format!("Run {}", run_id)),
        ProgressEvent::Start { goal, .. } => Some(format!("Goal: {}", truncate(goal, 80))),
        ProgressEvent::Phase { name } => Some(format!(
            "Phase {}: {}",
            name.number(),
            phase_name(name)
        )),
        ProgressEvent::Action { tool, input } => Some(format!(
            "  {} {}",
            tool,
            truncate(&input.to_string(), 60)
        )),
        ProgressEvent::Observation {
            tool,
            success,
            result,
        } => Some(format!(
            "  {} {} {}",
            if *success { "ok" } else { "failed" },
            tool,
            truncate(result, 60)
        )),
        ProgressEvent::PromptReady { units, .. } => Some(format!("Plan ready: {} units", units)),
        ProgressEvent::UnitAssetComplete {
            unit_index, stage, ..
        } => Some(format!(
            "  unit {} {} done",
            unit_index + 1,
            stage_name(stage)
        )),
        ProgressEvent::UnitAssetError {
            unit_index,
            stage,
            error,
            will_retry,
        } => Some(format!(
            "  unit {} {} failed: {}{}",
            unit_index + 1,
            stage_name(stage),
            truncate(error, 60),
            if *will_retry { " (retrying)" } else { "" }
        )),
        ProgressEvent::Complete {
            succeeded, failed, ..
        } => Some(format!(
            "Done: {} units assembled, {} failed",
            succeeded.len(),
            failed.len()
        )),
        ProgressEvent::Error { message } => Some(format!("Error: {}", message)),
        ProgressEvent::Thought { .. }
        | ProgressEvent::Heartbeat { .. }
        | ProgressEvent::UnitAssetStart { .. }
        | ProgressEvent::UnitAssetProgress { .. } => None,
    }
}

/// Live terminal display: a spinner per phase plus a log of unit results.
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
    verbose: bool,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
            verbose: false,
        }
    }

    /// Also print planner thoughts and tool traffic.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::new()
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn println(&self, line: impl AsRef<str>) {
        let _ = self.multi.println(line);
    }

    fn set_message(&self, message: String) {
        if let Some(pb) = self
            .phase_bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            pb.set_message(message);
        }
    }

    fn finish_current_phase(&self) {
        if let Some(pb) = self
            .phase_bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pb.finish_and_clear();
        }
    }

    fn start_phase(&self, phase: &PipelinePhase) {
        self.finish_current_phase();
        self.println(format!(
            "{} {}",
            format!("[{}/4]", phase.number()).dimmed(),
            phase_name(phase).bold()
        ));

        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::phase_style());
        pb.set_prefix(phase_name(phase));
        pb.set_message("...");
        pb.enable_steady_tick(Duration::from_millis(100));
        *self
            .phase_bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressRenderer for ProgressReporter {
    fn render(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunSubmitted { .. } | ProgressEvent::Start { .. } => {
                if let Some(line) = describe(event) {
                    self.println(line.dimmed().to_string());
                }
            }
            ProgressEvent::Phase { name } => self.start_phase(name),
            ProgressEvent::Thought { text } => {
                if self.verbose {
                    self.println(format!("    {}", truncate(text, 100).dimmed()));
                }
            }
            ProgressEvent::Action { tool, input } => {
                self.set_message(format!("Running: {}", tool));
                if self.verbose {
                    self.println(format!(
                        "    {} {}",
                        tool.cyan(),
                        truncate(&input.to_string(), 60).dimmed()
                    ));
                }
            }
            ProgressEvent::Observation { tool, success, .. } => {
                if self.verbose {
                    let mark = if *success { "✓".green() } else { "✗".red() };
                    self.println(format!("    {} {}", mark, tool));
                }
            }
            ProgressEvent::Heartbeat {
                iteration,
                elapsed_secs,
            } => self.set_message(format!(
                "still thinking (iteration {}, {}s)",
                iteration, elapsed_secs
            )),
            ProgressEvent::UnitAssetStart {
                unit_index,
                stage,
                attempt,
            } => self.set_message(format!(
                "unit {} {} (attempt {})",
                unit_index + 1,
                stage_name(stage),
                attempt
            )),
            ProgressEvent::UnitAssetProgress {
                unit_index,
                stage,
                progress,
            } => self.set_message(format!(
                "unit {} {} {}%",
                unit_index + 1,
                stage_name(stage),
                progress
            )),
            ProgressEvent::UnitAssetComplete {
                unit_index, stage, ..
            } => self.println(format!(
                "  {} unit {} {}",
                "✓".green(),
                unit_index + 1,
                stage_name(stage)
            )),
            ProgressEvent::UnitAssetError { will_retry, .. } => {
                if let Some(line) = describe(event) {
                    let line = line.trim_start().to_string();
                    if *will_retry {
                        self.println(format!("  {} {}", "↻".yellow(), line.yellow()));
                    } else {
                        self.println(format!("  {} {}", "✗".red(), line.red()));
                    }
                }
            }
            ProgressEvent::PromptReady { units, .. } => {
                self.println(format!("  {} plan ready: {} units", "✓".green(), units));
            }
            ProgressEvent::Complete { .. } => {
                self.finish_current_phase();
                if let Some(line) = describe(event) {
                    self.println(line.green().bold().to_string());
                }
            }
            ProgressEvent::Error { message } => {
                self.finish_current_phase();
                self.println(format!("{} {}", "Error:".red().bold(), message));
            }
        }
    }

    fn finish(&self) {
        self.finish_current_phase();
    }
}

/// Plain line-per-event output for non-interactive terminals.
pub struct SimpleProgress;

impl ProgressRenderer for SimpleProgress {
    fn render(&self, event: &ProgressEvent) {
        if let Some(line) = describe(event) {
            eprintln!("{}", line);
        }
    }
}

/// Renders nothing (`--quiet`, JSON output).
pub struct NoProgress;

impl ProgressRenderer for NoProgress {
    fn render(&self, _event: &ProgressEvent) {}
}
