//! One JSON file per run: `<dir>/<run_id>.json`.

use async_trait::async_trait;
use atelier_application::{RunStore, RunStoreError};
use atelier_domain::{RunId, RunSnapshot};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonFileRunStore {
    dir: PathBuf,
}

impl JsonFileRunStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, run_id: &RunId) -> PathBuf {
        self.dir.join(format!("{}.json", run_id))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> RunStoreError {
    RunStoreError::Io(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl RunStore for JsonFileRunStore {
    /// Write to a sibling temp file, then rename over the target so readers
    /// never observe a partial snapshot.
    async fn save(&self, snapshot: &RunSnapshot) -> Result<(), RunStoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let path = self.path_for(&snapshot.run_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| RunStoreError::Corrupt {
            run_id: snapshot.run_id.to_string(),
            reason: e.to_string(),
        })?;

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        debug!(run_id = %snapshot.run_id, phase = %snapshot.phase, "snapshot saved");
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<Option<RunSnapshot>, RunStoreError> {
        let path = self.path_for(run_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RunStoreError::Corrupt {
                run_id: run_id.to_string(),
                reason: e.to_string(),
            })
    }
}
