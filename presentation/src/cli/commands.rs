//! CLI command definitions

use atelier_domain::{GenerationRequest, ReferenceAsset};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How the final result is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// The full run report as JSON
    Json,
}

/// CLI arguments for atelier
#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(author, version, about = "Plan and generate multi-part visual media from a single goal")]
#[command(long_about = r#"
atelier turns a creative goal into a finished multi-part artifact.

The run has four phases:
1. Planning: a reasoning model researches the goal and writes a unit-by-unit plan
2. Asset generation: every unit's image (and narration audio) is generated concurrently
3. Transform: generated images are animated into video clips
4. Assembly: successful units are composed, in plan order, into one artifact

A failed unit never stops the others; the artifact is built from whatever succeeded.

Configuration files are loaded from (in priority order):
1. ATELIER_* environment variables
2. --config <path>     Explicit config file
3. ./atelier.toml      Project-level config
4. ~/.config/atelier/config.toml   Global config

Example:
  atelier "A six-slide explainer on how tides work"
  atelier "Product teaser for a trail shoe" --style "moody, film grain" \
      --reference "https://cdn.example.com/shoe.png hero shot"
"#)]
pub struct Cli {
    /// What to create
    #[arg(required_unless_present = "show_config")]
    pub goal: Option<String>,

    /// Reference asset as "URL [description]" (can be specified multiple times)
    #[arg(short, long = "reference", value_name = "URL [DESCRIPTION]")]
    pub references: Vec<ReferenceAsset>,

    /// Style guidance applied to every unit
    #[arg(short, long)]
    pub style: Option<String>,

    /// Planner iteration budget (overrides config)
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Keep run snapshots in memory instead of writing them to disk
    #[arg(long)]
    pub no_persist: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// The generation request described by the arguments, if a goal was given.
    pub fn request(&self) -> Option<GenerationRequest> {
        let goal = self.goal.as_ref()?;
        let mut request = self
            .references
            .iter()
            .cloned()
            .fold(GenerationRequest::new(goal.clone()), |req, asset| {
                req.with_reference(asset)
            });
        if let Some(style) = &self.style {
            request = request.with_style(style.clone());
        }
        Some(request)
    }
}
