//! Presentation layer for atelier
//!
//! This crate contains the CLI definition, the progress renderers that
//! drain a run's event channel, and the result formatter.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{
    NoProgress, ProgressRenderer, ProgressReporter, SimpleProgress, describe, drain_events,
};
