//! Periodic liveness events while a long-running step is in progress.

use crate::ports::events::EventEmitter;
use atelier_domain::ProgressEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Emits `heartbeat` events every `interval` until dropped.
pub(crate) struct HeartbeatGuard {
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatGuard {
    /// `iteration` is read at every tick so events carry the current turn.
    pub(crate) fn spawn(
        emitter: EventEmitter,
        interval: Duration,
        iteration: Arc<AtomicUsize>,
    ) -> Self {
        if interval.is_zero() {
            return Self { handle: None };
        }
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval_at(started + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                emitter
                    .emit(ProgressEvent::Heartbeat {
                        iteration: iteration.load(Ordering::Relaxed),
                        elapsed_secs: started.elapsed().as_secs(),
                    })
                    .await;
            }
        });
        Self {
            handle: Some(handle),
        }
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
