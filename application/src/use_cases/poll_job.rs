//! Async job poller: turns a queued provider job into an awaitable result.
//!
//! Polls on a fixed interval until the job completes or fails, or until the
//! wall-clock budget runs out. Transient poll failures are logged and the
//! wait continues; a permanent poll failure (the provider rejected the
//! status request itself, e.g. unknown job or bad credentials) ends the wait
//! immediately since repeating the same request cannot succeed.
//!
//! The poller never cancels provider-side work. On timeout the job is left
//! running remotely and only the caller's wait ends.

use crate::ports::provider_client::ProviderClient;
use atelier_domain::{Job, ProviderError, RemoteStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Job {job_id} did not finish within {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    #[error("Job {job_id} failed: {error}")]
    JobFailed { job_id: String, error: String },

    #[error("Polling job {job_id} failed: {source}")]
    Provider {
        job_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Job {job_id} has no provider job id to poll")]
    NotQueued { job_id: String },
}

impl PollError {
    /// A retry with a fresh job may succeed.
    ///
    /// A timeout is not retryable: the provider-side job keeps running, and
    /// a fresh submission would put a second job in flight for the same work.
    pub fn is_retryable(&self) -> bool {
        match self {
            PollError::JobFailed { .. } => true,
            PollError::Provider { source, .. } => source.is_transient(),
            PollError::Timeout { .. } | PollError::NotQueued { .. } => false,
        }
    }
}

/// Interval and wall-clock budget for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

pub struct JobPoller {
    policy: PollPolicy,
}

impl JobPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll `job_id` until terminal and return the result URL.
    ///
    /// `on_progress` runs after every successful poll, whether or not the
    /// status changed. Returns [`PollError::Timeout`] no earlier than the
    /// configured timeout.
    pub async fn wait_for(
        &self,
        client: &dyn ProviderClient,
        job_id: &str,
        mut on_progress: impl FnMut(u8) + Send,
    ) -> Result<String, PollError> {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut polls = 0u32;

        loop {
            polls += 1;
            // A slow status call gets at least one interval before we give up on it.
            let call_deadline = deadline.max(Instant::now() + self.policy.interval);
            match tokio::time::timeout_at(call_deadline, client.poll(job_id)).await {
                Ok(Ok(poll)) => {
                    on_progress(poll.progress);
                    match poll.status {
                        RemoteStatus::Completed => {
                            debug!("Job {} completed after {} poll(s)", job_id, polls);
                            return poll.result_url.ok_or_else(|| PollError::JobFailed {
                                job_id: job_id.to_string(),
                                error: "completed without a result URL".to_string(),
                            });
                        }
                        RemoteStatus::Failed => {
                            return Err(PollError::JobFailed {
                                job_id: job_id.to_string(),
                                error: poll
                                    .error
                                    .unwrap_or_else(|| "provider reported failure".to_string()),
                            });
                        }
                        RemoteStatus::Pending | RemoteStatus::Processing => {}
                    }
                }
                Ok(Err(e)) if e.is_transient() => {
                    warn!("Transient error polling job {}: {}", job_id, e.message);
                }
                Ok(Err(e)) => {
                    return Err(PollError::Provider {
                        job_id: job_id.to_string(),
                        source: e,
                    });
                }
                Err(_) => {
                    warn!("Status request for job {} timed out", job_id);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PollError::Timeout {
                    job_id: job_id.to_string(),
                    waited: now - started,
                });
            }
            tokio::time::sleep_until((now + self.policy.interval).min(deadline)).await;
        }
    }

    /// [`wait_for`](Self::wait_for) on a [`Job`], recording every transition.
    ///
    /// On timeout the job is marked abandoned; on failure it is marked failed.
    pub async fn track(
        &self,
        client: &dyn ProviderClient,
        job: &mut Job,
        mut on_progress: impl FnMut(u8) + Send,
    ) -> Result<String, PollError> {
        let Some(external_id) = job.external_id.clone() else {
            return Err(PollError::NotQueued {
                job_id: job.id.to_string(),
            });
        };

        let mut observed: Vec<u8> = Vec::new();
        let outcome = self
            .wait_for(client, &external_id, |p| {
                observed.push(p);
                on_progress(p);
            })
            .await;

        for p in observed {
            // Only fails once terminal, which cannot happen before the outcome below.
            let _ = job.observe_progress(p);
        }

        let recorded = match &outcome {
            Ok(url) => job.complete(url.clone()),
            Err(e @ PollError::Timeout { .. }) => job.abandon(e.to_string()),
            Err(e) => job.fail(e.to_string()),
        };
        if let Err(e) = recorded {
            warn!("Could not record outcome of job {}: {}", job.id, e);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atelier_domain::{
        JobPoll, JobStatus, ProviderKey, ProviderKind, ProviderRequest, Submission,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider whose `poll` answers from a script; the last entry repeats.
    struct ScriptedPolls {
        key: ProviderKey,
        script: Mutex<VecDeque<Result<JobPoll, ProviderError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedPolls {
        fn new(script: Vec<Result<JobPoll, ProviderError>>) -> Self {
            Self {
                key: ProviderKey::new("scripted", "default"),
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ProviderClient for ScriptedPolls {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Image
        }

        fn key(&self) -> &ProviderKey {
            &self.key
        }

        async fn submit(&self, _request: &ProviderRequest) -> Result<Submission, ProviderError> {
            Ok(Submission::Queued {
                job_id: "ext-1".into(),
            })
        }

        async fn poll(&self, _job_id: &str) -> Result<JobPoll, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    fn poller(interval_ms: u64, timeout_ms: u64) -> JobPoller {
        JobPoller::new(PollPolicy::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_result_after_pending_processing_completed() {
        let client = ScriptedPolls::new(vec![
            Ok(JobPoll::pending()),
            Ok(JobPoll::processing(40)),
            Ok(JobPoll::processing(40)),
            Ok(JobPoll::completed("https://cdn/x.png")),
        ]);
        let mut progress = Vec::new();
        let url = poller(1000, 60_000)
            .wait_for(&client, "ext-1", |p| progress.push(p))
            .await
            .unwrap();
        assert_eq!(url, "https://cdn/x.png");
        // reported on every poll, even when unchanged
        assert_eq!(progress, vec![0, 40, 40, 100]);
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_no_earlier_than_budget() {
        let client = ScriptedPolls::new(vec![Ok(JobPoll::processing(10))]);
        let started = Instant::now();
        let err = poller(3000, 10_000)
            .wait_for(&client, "ext-1", |_| {})
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, PollError::Timeout { .. }));
        assert!(elapsed >= Duration::from_millis(10_000));
        assert!(elapsed < Duration::from_millis(13_000));
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_poll_errors_do_not_end_the_wait() {
        let client = ScriptedPolls::new(vec![
            Err(ProviderError::transient("connection reset")),
            Err(ProviderError::transient("503")),
            Ok(JobPoll::completed("https://cdn/y.mp4")),
        ]);
        let url = poller(500, 60_000)
            .wait_for(&client, "ext-1", |_| {})
            .await
            .unwrap();
        assert_eq!(url, "https://cdn/y.mp4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_poll_error_fails_fast() {
        let client = ScriptedPolls::new(vec![Err(ProviderError::permanent("unknown job"))]);
        let err = poller(500, 60_000)
            .wait_for(&client, "ext-1", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Provider { .. }));
        assert!(!err.is_retryable());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_returns_provider_error_text() {
        let client = ScriptedPolls::new(vec![Ok(JobPoll::failed("NSFW filter"))]);
        let err = poller(500, 60_000)
            .wait_for(&client, "ext-1", |_| {})
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PollError::JobFailed {
                job_id: "ext-1".into(),
                error: "NSFW filter".into()
            }
        );
    }

    fn queued_job() -> Job {
        let mut job = Job::new(
            ProviderKey::new("scripted", "default"),
            ProviderRequest::new(ProviderKind::Image, "a harbour"),
        );
        job.mark_queued("ext-1").unwrap();
        job
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_marks_job_abandoned_on_timeout() {
        let client = ScriptedPolls::new(vec![Ok(JobPoll::processing(55))]);
        let mut job = queued_job();
        let result = poller(1000, 3000).track(&client, &mut job, |_| {}).await;

        assert!(result.is_err());
        assert_eq!(job.status, JobStatus::Abandoned);
        assert_eq!(job.progress, 55);
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_completes_job() {
        let client = ScriptedPolls::new(vec![Ok(JobPoll::completed("https://cdn/z.png"))]);
        let mut job = queued_job();
        poller(1000, 3000).track(&client, &mut job, |_| {}).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result_url.as_deref(), Some("https://cdn/z.png"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_requires_external_id() {
        let client = ScriptedPolls::new(vec![Ok(JobPoll::pending())]);
        let mut job = Job::new(
            ProviderKey::new("scripted", "default"),
            ProviderRequest::new(ProviderKind::Image, "a harbour"),
        );
        let err = poller(1000, 3000)
            .track(&client, &mut job, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::NotQueued { .. }));
    }
}
