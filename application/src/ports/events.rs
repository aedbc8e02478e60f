//! Progress event channel.
//!
//! The pipeline writes [`ProgressEvent`]s into a bounded channel and the
//! transport layer drains the receiving end.

use atelier_domain::ProgressEvent;
use tokio::sync::mpsc;
use tracing::{debug, trace};

pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Sending half of the progress stream.
///
/// Cloneable; every concurrent unit task holds its own copy.
#[derive(Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<ProgressEvent>,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create an emitter with its receiver.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Emitter whose events go nowhere.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self::new(tx)
    }

    /// Send an event, waiting for capacity. A closed receiver is not an
    /// error for the run: the consumer simply stopped listening.
    ///
    /// Advisory events never wait; they go through [`Self::try_emit`].
    pub async fn emit(&self, event: ProgressEvent) {
        if event.is_advisory() {
            self.try_emit(event);
            return;
        }
        if let Err(e) = self.tx.send(event).await {
            debug!("Progress receiver closed, dropping {}", e.0.kind());
        }
    }

    /// Send reasoning text without waiting; dropped when the channel is full.
    pub fn emit_thought(&self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.try_emit(ProgressEvent::Thought { text });
    }

    /// Send without waiting; dropped when the channel is full or closed.
    /// Meant for advisory events such as poll progress.
    pub fn try_emit(&self, event: ProgressEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let event = match e {
                mpsc::error::TrySendError::Full(ev) | mpsc::error::TrySendError::Closed(ev) => ev,
            };
            trace!("{} event dropped under backpressure", event.kind());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_domain::PipelinePhase;

    #[tokio::test]
    async fn test_thoughts_are_dropped_when_full() {
        let (emitter, mut rx) = EventEmitter::channel(1);
        emitter.emit_thought("first");
        emitter.emit_thought("second");

        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::Thought {
                text: "first".into()
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typed_events_wait_for_capacity() {
        let (emitter, mut rx) = EventEmitter::channel(1);
        emitter
            .emit(ProgressEvent::Phase {
                name: PipelinePhase::Planning,
            })
            .await;

        let sender = emitter.clone();
        let pending = tokio::spawn(async move {
            sender
                .emit(ProgressEvent::Phase {
                    name: PipelinePhase::Assembly,
                })
                .await;
        });

        assert!(matches!(rx.recv().await, Some(ProgressEvent::Phase { .. })));
        pending.await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::Phase {
                name: PipelinePhase::Assembly
            })
        );
    }

    #[tokio::test]
    async fn test_advisory_emit_does_not_wait_on_full_channel() {
        let (emitter, mut rx) = EventEmitter::channel(1);
        emitter
            .emit(ProgressEvent::Phase {
                name: PipelinePhase::AssetGeneration,
            })
            .await;

        let sent = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            emitter.emit(ProgressEvent::Thought {
                text: "still thinking".into(),
            }),
        )
        .await;
        assert!(sent.is_ok());

        assert!(matches!(rx.recv().await, Some(ProgressEvent::Phase { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_silent() {
        let (emitter, rx) = EventEmitter::channel(4);
        drop(rx);
        emitter.emit(ProgressEvent::Error { message: "x".into() }).await;
        assert!(emitter.is_closed());
    }
}
