//! Persisted run state port.

use async_trait::async_trait;
use atelier_domain::{RunId, RunSnapshot};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunStoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt snapshot for run {run_id}: {reason}")]
    Corrupt { run_id: String, reason: String },
}

/// Durable storage of [`RunSnapshot`]s, last writer wins.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save(&self, snapshot: &RunSnapshot) -> Result<(), RunStoreError>;

    async fn load(&self, run_id: &RunId) -> Result<Option<RunSnapshot>, RunStoreError>;
}

/// Process-local store for tests and `--no-persist` runs.
#[derive(Default)]
pub struct InMemoryRunStore {
    snapshots: Mutex<HashMap<RunId, RunSnapshot>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save(&self, snapshot: &RunSnapshot) -> Result<(), RunStoreError> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.run_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<Option<RunSnapshot>, RunStoreError> {
        Ok(self
            .snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_domain::{GenerationRequest, RunPhase};

    #[tokio::test]
    async fn test_in_memory_store_overwrites() {
        let store = InMemoryRunStore::new();
        let id = RunId::generate();
        let mut snapshot = RunSnapshot::new(id.clone(), GenerationRequest::new("g"));
        store.save(&snapshot).await.unwrap();
        snapshot.record(RunPhase::Planning, None);
        store.save(&snapshot).await.unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.phase, RunPhase::Planning);
        assert_eq!(store.len(), 1);
        assert!(store.load(&RunId::generate()).await.unwrap().is_none());
    }
}
