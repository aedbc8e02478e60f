//! Output, pipeline and logging configuration from TOML

use atelier_application::PipelineParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the final result is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOutputFormat {
    #[default]
    Text,
    Json,
}

/// Raw output configuration from TOML (`[output]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Root directory for run snapshots and assembled artifacts
    pub dir: PathBuf,
    pub format: Option<FileOutputFormat>,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("atelier-output"),
            format: None,
            color: true,
        }
    }
}

impl FileOutputConfig {
    pub fn runs_dir(&self) -> PathBuf {
        self.dir.join("runs")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.dir.join("artifacts")
    }
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Extra attempts for a failed per-unit job
    pub unit_retries: u32,
    /// Run the image -> video transform phase
    pub transform: bool,
    /// Synthesize narration audio
    pub narration: bool,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let params = PipelineParams::default();
        Self {
            unit_retries: params.unit_retries,
            transform: params.transform,
            narration: params.narration,
        }
    }
}

impl FilePipelineConfig {
    pub fn to_pipeline_params(&self) -> PipelineParams {
        PipelineParams::default()
            .with_unit_retries(self.unit_retries)
            .with_transform(self.transform)
            .with_narration(self.narration)
    }
}

/// `[logging]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily rotating log files; stderr only when unset
    pub dir: Option<PathBuf>,
    /// Write the planner transcript as JSONL next to the run snapshot
    pub conversation_log: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_deserialize() {
        let toml_str = r#"
[output]
format = "json"
dir = "/tmp/atelier"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.output.format, Some(FileOutputFormat::Json));
        assert_eq!(config.output.runs_dir(), PathBuf::from("/tmp/atelier/runs"));
    }

    #[test]
    fn test_pipeline_defaults_match_params() {
        let params = FilePipelineConfig::default().to_pipeline_params();
        assert_eq!(params, PipelineParams::default());
        assert_eq!(params.max_attempts(), 2);
    }
}
