//! Submission entry point: start a run in the background and hand back its
//! identifier, progress stream and cancellation token.

use crate::ports::events::{DEFAULT_EVENT_BUFFER, EventEmitter};
use crate::use_cases::run_pipeline::{GenerationPipeline, PipelineError, PipelineReport};
use atelier_domain::{DomainError, GenerationRequest, ProgressEvent, RunId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

/// A running generation.
pub struct RunHandle {
    pub run_id: RunId,
    /// Ordered progress events; closes when the run ends.
    pub events: mpsc::Receiver<ProgressEvent>,
    /// Cooperative abort: no new provider jobs are admitted once cancelled.
    pub cancel: CancellationToken,
    pub join: JoinHandle<Result<PipelineReport, PipelineError>>,
}

pub struct RunLauncher {
    pipeline: Arc<GenerationPipeline>,
    event_buffer: usize,
}

impl RunLauncher {
    pub fn new(pipeline: Arc<GenerationPipeline>) -> Self {
        Self {
            pipeline,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_event_buffer(mut self, buffer: usize) -> Self {
        self.event_buffer = buffer;
        self
    }

    /// Validate `request` and start it on a background task.
    pub fn submit(&self, request: GenerationRequest) -> Result<RunHandle, DomainError> {
        self.submit_with_token(request, CancellationToken::new())
    }

    /// Like [`submit`](Self::submit), with a caller-owned cancellation token.
    pub fn submit_with_token(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<RunHandle, DomainError> {
        self.submit_as(RunId::generate(), request, cancel)
    }

    /// Start a run under an id chosen by the caller, e.g. one already used
    /// to name per-run log files.
    pub fn submit_as(
        &self,
        run_id: RunId,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<RunHandle, DomainError> {
        request.validate()?;

        let (emitter, events) = EventEmitter::channel(self.event_buffer);
        info!("Submitted run {}", run_id);

        let pipeline = Arc::clone(&self.pipeline);
        let task_run_id = run_id.clone();
        let task_cancel = cancel.clone();
        let span = info_span!("run", run_id = %run_id);
        let join = tokio::spawn(
            async move {
                emitter
                    .emit(ProgressEvent::RunSubmitted {
                        run_id: task_run_id.to_string(),
                    })
                    .await;
                pipeline
                    .run(task_run_id, request, &emitter, &task_cancel)
                    .await
            }
            .instrument(span),
        );

        Ok(RunHandle {
            run_id,
            events,
            cancel,
            join,
        })
    }
}
