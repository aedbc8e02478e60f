//! Provider client port
//!
//! Uniform contract over external creative-AI providers (image, video,
//! speech). Provider-specific request shaping stays inside the adapter.

use async_trait::async_trait;
use atelier_domain::{JobPoll, ProviderError, ProviderKey, ProviderKind, ProviderRequest, Submission};

/// Client for one provider+tier.
///
/// Implementations perform network I/O only and hold no state shared with
/// other clients. Errors carry a [`ProviderErrorKind`](atelier_domain::ProviderErrorKind)
/// so callers know whether a retry is worthwhile.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Rate-limit key (`provider:tier`).
    fn key(&self) -> &ProviderKey;

    /// Submit a request; either a synchronous result or a job handle.
    async fn submit(&self, request: &ProviderRequest) -> Result<Submission, ProviderError>;

    /// Query the status of a previously queued job.
    async fn poll(&self, job_id: &str) -> Result<JobPoll, ProviderError>;
}
