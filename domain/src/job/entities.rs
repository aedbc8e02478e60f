//! [`Job`] entity and its state machine.
//!
//! ```text
//! Pending ──> Processing ──> Completed
//!    │            ├────────> Failed
//!    │            └────────> Abandoned   (caller stopped waiting)
//!    ├──────────────────────> Completed   (synchronous provider result)
//!    └──────────────────────> Failed      (submission rejected)
//! ```
//!
//! Jobs are append-only: a terminal job is never reopened. A retry creates
//! a new job with `attempt + 1`.

use crate::core::error::DomainError;
use crate::provider::{ProviderKey, ProviderRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(format!("job-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Abandoned,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Abandoned
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request against an external generation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub provider: ProviderKey,
    pub request: ProviderRequest,
    /// Owning unit; `None` for run-level work such as assembly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_index: Option<usize>,
    /// 1 for the first submission, incremented by each retry.
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(provider: ProviderKey, request: ProviderRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(),
            provider,
            request,
            unit_index: None,
            attempt: 1,
            external_id: None,
            status: JobStatus::Pending,
            progress: 0,
            result_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn for_unit(mut self, index: usize) -> Self {
        self.unit_index = Some(index);
        self
    }

    /// Fresh job for the same unit and request, one attempt later.
    pub fn retry(&self) -> Self {
        let mut next = Job::new(self.provider.clone(), self.request.clone());
        next.unit_index = self.unit_index;
        next.attempt = self.attempt + 1;
        next
    }

    fn ensure_open(&self, to: JobStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::transition(self.status, to));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record the provider-assigned job id after an asynchronous submission.
    pub fn mark_queued(&mut self, external_id: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open(JobStatus::Pending)?;
        self.external_id = Some(external_id.into());
        self.touch();
        Ok(())
    }

    /// Record a progress observation. Moves `Pending` to `Processing`;
    /// progress never moves backwards.
    pub fn observe_progress(&mut self, progress: u8) -> Result<(), DomainError> {
        self.ensure_open(JobStatus::Processing)?;
        self.status = JobStatus::Processing;
        self.progress = self.progress.max(progress.min(100));
        self.touch();
        Ok(())
    }

    pub fn complete(&mut self, result_url: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result_url = Some(result_url.into());
        self.touch();
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.touch();
        Ok(())
    }

    /// The caller stopped waiting; the provider may still be working on it.
    pub fn abandon(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open(JobStatus::Abandoned)?;
        self.status = JobStatus::Abandoned;
        self.error = Some(reason.into());
        self.touch();
        Ok(())
    }
}
