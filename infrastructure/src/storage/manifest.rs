//! Manifest assembler
//!
//! Writes the assembled presentation as a JSON manifest under
//! `<dir>/<run_id>/manifest.json`: global settings, then the ordered
//! segments with their visual and audio URLs. A renderer can consume the
//! manifest without re-running any generation.

use async_trait::async_trait;
use atelier_application::{Assembler, AssemblyRequest, Segment};
use atelier_domain::{GlobalSettings, ProviderError, RunId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const MANIFEST_VERSION: u32 = 1;

#[derive(Serialize)]
struct Manifest<'a> {
    version: u32,
    run_id: &'a RunId,
    theme: &'a str,
    brief: &'a str,
    settings: &'a GlobalSettings,
    /// Transition applied between consecutive segments.
    transition: &'static str,
    segments: Vec<&'a Segment>,
    created_at: DateTime<Utc>,
}

pub struct ManifestAssembler {
    dir: PathBuf,
}

impl ManifestAssembler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn manifest_path(&self, run_id: &RunId) -> PathBuf {
        self.dir.join(run_id.as_str()).join("manifest.json")
    }
}

fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

#[async_trait]
impl Assembler for ManifestAssembler {
    async fn assemble(&self, request: &AssemblyRequest) -> Result<String, ProviderError> {
        let mut segments: Vec<&Segment> = request.segments.iter().collect();
        segments.sort_by_key(|s| s.unit_index);

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            run_id: &request.run_id,
            theme: &request.theme,
            brief: &request.brief,
            settings: &request.settings,
            transition: request.settings.transition.as_str(),
            segments,
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| ProviderError::permanent(format!("manifest encoding: {}", e)))?;

        let path = self.manifest_path(&request.run_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ProviderError::permanent(format!("{}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| ProviderError::permanent(format!("{}: {}", path.display(), e)))?;

        info!(
            run_id = %request.run_id,
            segments = request.segments.len(),
            path = %path.display(),
            "manifest written"
        );
        Ok(file_url(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn segment(index: usize, flags: &[&str]) -> Segment {
        Segment {
            unit_index: index,
            title: format!("Unit {}", index),
            image_url: Some(format!("https://cdn.test/{}.png", index)),
            video_url: None,
            audio_url: None,
            subtitle: Some("narration".to_string()),
            chart: None,
            flags: flags.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_writes_ordered_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = ManifestAssembler::new(dir.path());
        let request = AssemblyRequest {
            run_id: RunId::generate(),
            theme: "Tides".to_string(),
            brief: "How the moon moves the sea".to_string(),
            settings: GlobalSettings::default(),
            segments: vec![segment(3, &[]), segment(0, &["motion_failed"]), segment(1, &[])],
        };

        let url = assembler.assemble(&request).await.unwrap();
        let path = assembler.manifest_path(&request.run_id);
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("manifest.json"));

        let manifest: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        let order: Vec<u64> = manifest["segments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["unit_index"].as_u64().unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 3]);
        assert_eq!(manifest["segments"][0]["flags"][0], "motion_failed");
        assert_eq!(manifest["transition"], "fade");
        assert_eq!(manifest["theme"], "Tides");
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_permanent_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let assembler = ManifestAssembler::new(&blocker);
        let request = AssemblyRequest {
            run_id: RunId::generate(),
            theme: String::new(),
            brief: String::new(),
            settings: GlobalSettings::default(),
            segments: vec![segment(0, &[])],
        };
        let err = assembler.assemble(&request).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
