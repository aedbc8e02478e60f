//! Rate-limited queue: per provider+tier concurrency and pacing gate.
//!
//! Every caller that fans out provider requests goes through
//! [`RateLimitedQueue::enqueue`]. For each [`ProviderKey`] the queue keeps
//!
//! - an in-flight counter capped at `max_concurrent`,
//! - a FIFO of waiting callers,
//! - the start instant of the last admission, so consecutive starts are
//!   spaced by at least `min_interval`.
//!
//! State for a key is created lazily and lives as long as the queue.
//!
//! ```text
//! enqueue(key, task)
//!   ├─ slot free and nobody waiting ──> admit now
//!   └─ otherwise ──> push oneshot sender to FIFO, await admission
//!
//! permit dropped (task done, failed or caller gone)
//!   └─ in_flight -= 1, admit front waiter (skipping abandoned ones)
//! ```
//!
//! Admission hands the [`QueuePermit`] itself through the oneshot channel.
//! If the waiting caller has gone away, the send fails, the permit is
//! dropped on the spot and the slot moves on to the next waiter.

use atelier_domain::ProviderKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid rate limit: max_concurrent must be at least 1")]
    InvalidPolicy,

    #[error("Rate-limited queue closed before admission")]
    Closed,
}

/// Concurrency and pacing budget for one provider+tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    max_concurrent: usize,
    min_interval: Duration,
}

impl RateLimitPolicy {
    /// Rejects `max_concurrent == 0`.
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Result<Self, QueueError> {
        if max_concurrent == 0 {
            return Err(QueueError::InvalidPolicy);
        }
        Ok(Self {
            max_concurrent,
            min_interval,
        })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            min_interval: Duration::from_millis(500),
        }
    }
}

/// Snapshot of one key's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    pub in_flight: usize,
    pub waiting: usize,
}

struct Admission {
    permit: QueuePermit,
    start_at: Instant,
}

enum Slot {
    Ready(Instant),
    Queued(oneshot::Receiver<Admission>),
}

struct KeyState {
    policy: RateLimitPolicy,
    in_flight: usize,
    waiting: VecDeque<oneshot::Sender<Admission>>,
    last_start: Option<Instant>,
}

impl KeyState {
    fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            in_flight: 0,
            waiting: VecDeque::new(),
            last_start: None,
        }
    }

    /// Reserve the next start instant, honoring the minimum interval.
    fn reserve_start(&mut self, now: Instant) -> Instant {
        let start = match self.last_start {
            Some(last) => now.max(last + self.policy.min_interval),
            None => now,
        };
        self.last_start = Some(start);
        start
    }
}

struct Inner {
    default_policy: RateLimitPolicy,
    policies: HashMap<ProviderKey, RateLimitPolicy>,
    states: Mutex<HashMap<ProviderKey, KeyState>>,
}

impl Inner {
    fn policy_for(&self, key: &ProviderKey) -> RateLimitPolicy {
        self.policies
            .get(key)
            .copied()
            .unwrap_or(self.default_policy)
    }

    fn release(self: &Arc<Self>, key: &ProviderKey) {
        let mut handoffs = Vec::new();
        {
            let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(state) = states.get_mut(key) else {
                return;
            };
            state.in_flight = state.in_flight.saturating_sub(1);

            while state.in_flight < state.policy.max_concurrent {
                let Some(tx) = state.waiting.pop_front() else {
                    break;
                };
                if tx.is_closed() {
                    trace!("Skipping abandoned waiter for {}", key);
                    continue;
                }
                state.in_flight += 1;
                let start_at = state.reserve_start(Instant::now());
                handoffs.push((tx, start_at));
            }
        }

        // Permits are created and sent outside the lock: a failed send drops
        // the permit, which re-enters `release`.
        for (tx, start_at) in handoffs {
            let permit = QueuePermit {
                inner: Arc::clone(self),
                key: key.clone(),
            };
            if tx.send(Admission { permit, start_at }).is_err() {
                debug!("Waiter for {} left before admission", key);
            }
        }
    }
}

/// Slot held while a task runs. Dropping it frees the slot.
pub struct QueuePermit {
    inner: Arc<Inner>,
    key: ProviderKey,
}

impl QueuePermit {
    pub fn key(&self) -> &ProviderKey {
        &self.key
    }
}

impl Drop for QueuePermit {
    fn drop(&mut self) {
        self.inner.release(&self.key);
    }
}

/// Process-wide gate shared by every caller targeting the same providers.
#[derive(Clone)]
pub struct RateLimitedQueue {
    inner: Arc<Inner>,
}

impl RateLimitedQueue {
    pub fn new(default_policy: RateLimitPolicy) -> Self {
        Self::with_policies(default_policy, HashMap::new())
    }

    pub fn with_policies(
        default_policy: RateLimitPolicy,
        policies: HashMap<ProviderKey, RateLimitPolicy>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                default_policy,
                policies,
                states: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn policy_for(&self, key: &ProviderKey) -> RateLimitPolicy {
        self.inner.policy_for(key)
    }

    /// Wait for a slot on `key`.
    ///
    /// Admission is FIFO per key. The returned future resolves once the slot
    /// is granted and the pacing interval since the previous start elapsed.
    pub async fn acquire(&self, key: &ProviderKey) -> Result<QueuePermit, QueueError> {
        let slot = {
            let mut states = self
                .inner
                .states
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let state = states
                .entry(key.clone())
                .or_insert_with(|| KeyState::new(self.inner.policy_for(key)));

            if state.in_flight < state.policy.max_concurrent && state.waiting.is_empty() {
                state.in_flight += 1;
                Slot::Ready(state.reserve_start(Instant::now()))
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiting.push_back(tx);
                trace!("{} queued behind {} waiter(s)", key, state.waiting.len() - 1);
                Slot::Queued(rx)
            }
        };

        let admission = match slot {
            Slot::Ready(start_at) => Admission {
                permit: QueuePermit {
                    inner: Arc::clone(&self.inner),
                    key: key.clone(),
                },
                start_at,
            },
            Slot::Queued(rx) => rx.await.map_err(|_| QueueError::Closed)?,
        };
        tokio::time::sleep_until(admission.start_at).await;
        Ok(admission.permit)
    }

    /// Run `task` once admitted for `key` and return its output.
    ///
    /// The slot is released when the task finishes, whatever its result; a
    /// failure reaches only this caller.
    pub async fn enqueue<F, Fut, T>(&self, key: &ProviderKey, task: F) -> Result<T, QueueError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let permit = self.acquire(key).await?;
        let output = task().await;
        drop(permit);
        Ok(output)
    }

    /// Current load of `key`. Never blocks on admission.
    pub fn status(&self, key: &ProviderKey) -> QueueStatus {
        let states = self
            .inner
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        states
            .get(key)
            .map(|s| QueueStatus {
                in_flight: s.in_flight,
                waiting: s.waiting.iter().filter(|tx| !tx.is_closed()).count(),
            })
            .unwrap_or_default()
    }
}
