//! Multi-phase generation pipeline.
//!
//! ```text
//! Phase 1  Planning          planner loop -> finalized GenerationPlan + brief
//! Phase 2  AssetGeneration   every unit concurrently: image (+ narration audio)
//! Phase 3  Transform         every unit with an image: image -> video
//! Phase 4  Assembly          eligible units in plan order -> one artifact
//! ```
//!
//! Every provider job goes through the [`RateLimitedQueue`] and, when the
//! provider answers asynchronously, the [`JobPoller`]. A unit failure never
//! stops its siblings. The run only fails as a whole when planning fails or
//! no unit is left to assemble.
//!
//! A [`RunSnapshot`] is persisted at every phase boundary.

use crate::config::PipelineParams;
use crate::ports::assembler::{Assembler, AssemblyRequest, Segment};
use crate::ports::events::EventEmitter;
use crate::ports::provider_client::ProviderClient;
use crate::ports::run_store::RunStore;
use crate::use_cases::plan_generation::{PlanGenerationUseCase, PlannerError};
use crate::use_cases::poll_job::{JobPoller, PollPolicy};
use crate::use_cases::rate_limit::RateLimitedQueue;
use atelier_domain::{
    AssetStage, AssetStatus, DomainError, GenerationPlan, GenerationRequest, Job, PipelinePhase,
    ProgressEvent, ProviderKind, ProviderRequest, RunId, RunPhase, RunSnapshot, Submission, Unit,
    UnitFailure,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const CANCELLED_BEFORE_ADMISSION: &str = "cancelled before admission";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Planning failed: {0}")]
    Planning(#[source] PlannerError),

    #[error("No unit produced a usable asset ({failed} failed)")]
    NoUsableUnits { failed: usize },

    #[error("Run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Fatal errors fail the run; cancellation is a requested stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Cancelled)
    }
}

/// A provider client with its polling policy.
#[derive(Clone)]
pub struct ProviderRoute {
    pub client: Arc<dyn ProviderClient>,
    pub poll: PollPolicy,
}

impl ProviderRoute {
    pub fn new(client: Arc<dyn ProviderClient>, poll: PollPolicy) -> Self {
        Self { client, poll }
    }
}

/// Providers used by Phases 2 and 3. Only the image provider is required.
#[derive(Clone)]
pub struct ProviderRoutes {
    pub image: ProviderRoute,
    pub video: Option<ProviderRoute>,
    pub speech: Option<ProviderRoute>,
}

impl ProviderRoutes {
    pub fn new(image: ProviderRoute) -> Self {
        Self {
            image,
            video: None,
            speech: None,
        }
    }

    pub fn with_video(mut self, route: ProviderRoute) -> Self {
        self.video = Some(route);
        self
    }

    pub fn with_speech(mut self, route: ProviderRoute) -> Self {
        self.speech = Some(route);
        self
    }
}

/// Result of a completed run, including partial success.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub artifact_url: Option<String>,
    /// Plan indices of assembled units, ascending.
    pub succeeded: Vec<usize>,
    pub failed: Vec<UnitFailure>,
    pub warnings: Vec<UnitFailure>,
    /// Set when the assembler itself failed.
    pub assembly_error: Option<String>,
    pub plan: GenerationPlan,
    pub brief: String,
}

/// Terminal outcome of one asset for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AssetOutcome {
    Completed(String),
    Failed(String),
    Skipped(String),
}

impl AssetOutcome {
    fn record(&self, status: &mut AssetStatus) -> Result<(), DomainError> {
        match self {
            AssetOutcome::Completed(url) => {
                status.start()?;
                status.complete(url.clone())
            }
            AssetOutcome::Failed(error) => {
                status.start()?;
                status.fail(error.clone())
            }
            AssetOutcome::Skipped(reason) => status.skip(reason.clone()),
        }
    }
}

/// Failure of one attempt.
struct AttemptError {
    message: String,
    retryable: bool,
}

/// Phase 2 work for one unit.
struct PrimaryWork {
    unit_index: usize,
    image: Option<ProviderRequest>,
    narration: Option<ProviderRequest>,
}

struct PrimaryResult {
    unit_index: usize,
    image: Option<AssetOutcome>,
    narration: Option<AssetOutcome>,
}

pub struct GenerationPipeline {
    planner: PlanGenerationUseCase,
    routes: ProviderRoutes,
    queue: RateLimitedQueue,
    assembler: Arc<dyn Assembler>,
    store: Arc<dyn RunStore>,
    params: PipelineParams,
}

impl GenerationPipeline {
    pub fn new(
        planner: PlanGenerationUseCase,
        routes: ProviderRoutes,
        queue: RateLimitedQueue,
        assembler: Arc<dyn Assembler>,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            planner,
            routes,
            queue,
            assembler,
            store,
            params: PipelineParams::default(),
        }
    }

    pub fn with_params(mut self, params: PipelineParams) -> Self {
        self.params = params;
        self
    }

    pub fn queue(&self) -> &RateLimitedQueue {
        &self.queue
    }

    /// Run all four phases for `request`.
    pub async fn run(
        &self,
        run_id: RunId,
        request: GenerationRequest,
        emitter: &EventEmitter,
        cancellation: &CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let mut snapshot = RunSnapshot::new(run_id.clone(), request.clone());
        self.persist(&snapshot).await;
        emitter
            .emit(ProgressEvent::Start {
                run_id: run_id.to_string(),
                goal: request.goal.clone(),
            })
            .await;

        // Phase 1
        self.enter(PipelinePhase::Planning, &mut snapshot, None, emitter)
            .await;
        let outcome = match self.planner.execute(&request, emitter, cancellation).await {
            Ok(outcome) => outcome,
            Err(PlannerError::Cancelled) => {
                return Err(self.cancelled(&mut snapshot, None, emitter).await);
            }
            Err(e) => {
                if let Some(state) = e.state() {
                    debug!(
                        "Planner stopped at iteration {} with {} tool call(s)",
                        state.iteration,
                        state.tool_log.len()
                    );
                }
                return Err(self
                    .abort(&mut snapshot, None, PipelineError::Planning(e), emitter)
                    .await);
            }
        };
        let brief = outcome.brief;
        let mut plan = outcome.plan;
        snapshot.final_brief = Some(brief.clone());

        // Phase 2
        self.enter(
            PipelinePhase::AssetGeneration,
            &mut snapshot,
            Some(&plan),
            emitter,
        )
        .await;
        self.generate_primary_assets(&mut plan, emitter, cancellation)
            .await;
        snapshot.record(RunPhase::AssetGeneration, Some(&plan));
        self.persist(&snapshot).await;
        if cancellation.is_cancelled() {
            return Err(self.cancelled(&mut snapshot, Some(&plan), emitter).await);
        }

        // Phase 3
        match self.routes.video.as_ref().filter(|_| self.params.transform) {
            Some(route) => {
                self.enter(PipelinePhase::Transform, &mut snapshot, Some(&plan), emitter)
                    .await;
                self.transform_assets(route, &mut plan, emitter, cancellation)
                    .await;
                snapshot.record(RunPhase::Transform, Some(&plan));
                self.persist(&snapshot).await;
                if cancellation.is_cancelled() {
                    return Err(self.cancelled(&mut snapshot, Some(&plan), emitter).await);
                }
            }
            None => {
                for unit in &mut plan.units {
                    skip_pending(&mut unit.motion, "transform disabled");
                }
            }
        }

        // Phase 4
        self.enter(PipelinePhase::Assembly, &mut snapshot, Some(&plan), emitter)
            .await;
        self.assemble(&run_id, plan, brief, &mut snapshot, emitter)
            .await
    }

    async fn generate_primary_assets(
        &self,
        plan: &mut GenerationPlan,
        emitter: &EventEmitter,
        cancellation: &CancellationToken,
    ) {
        let narrate = self.params.narration && self.routes.speech.is_some();
        let work: Vec<PrimaryWork> = plan
            .units
            .iter()
            .map(|unit| PrimaryWork {
                unit_index: unit.index,
                image: unit.image.as_ref().map(|cfg| {
                    ProviderRequest::new(ProviderKind::Image, cfg.prompt.clone())
                        .with_aspect_ratio(cfg.aspect_ratio)
                }),
                narration: unit
                    .narration
                    .as_ref()
                    .filter(|_| narrate)
                    .map(|text| ProviderRequest::new(ProviderKind::Speech, text.clone())),
            })
            .collect();

        info!("Generating primary assets for {} unit(s)", work.len());
        let results = join_all(
            work.into_iter()
                .map(|w| self.primary_assets(w, emitter, cancellation)),
        )
        .await;

        for result in results {
            let Some(unit) = plan.unit_mut(result.unit_index) else {
                continue;
            };
            if let (Some(outcome), Some(image)) = (&result.image, unit.image.as_mut())
                && let Err(e) = outcome.record(&mut image.status)
            {
                warn!("Unit {}: could not record image outcome: {}", unit.index, e);
            }
            match &result.narration {
                Some(outcome) => {
                    if let Err(e) = outcome.record(&mut unit.narration_audio) {
                        warn!("Unit {}: could not record narration outcome: {}", unit.index, e);
                    }
                }
                None => skip_pending(&mut unit.narration_audio, "no narration requested"),
            }
        }
    }

    async fn primary_assets(
        &self,
        work: PrimaryWork,
        emitter: &EventEmitter,
        cancellation: &CancellationToken,
    ) -> PrimaryResult {
        let index = work.unit_index;
        let image = async {
            match work.image {
                Some(request) => Some(
                    self.generate_asset(
                        &self.routes.image,
                        request,
                        index,
                        AssetStage::Image,
                        emitter,
                        cancellation,
                    )
                    .await,
                ),
                None => None,
            }
        };
        let narration = async {
            match (work.narration, self.routes.speech.as_ref()) {
                (Some(request), Some(route)) => Some(
                    self.generate_asset(
                        route,
                        request,
                        index,
                        AssetStage::Narration,
                        emitter,
                        cancellation,
                    )
                    .await,
                ),
                _ => None,
            }
        };
        let (image, narration) = tokio::join!(image, narration);
        PrimaryResult {
            unit_index: index,
            image,
            narration,
        }
    }

    async fn transform_assets(
        &self,
        route: &ProviderRoute,
        plan: &mut GenerationPlan,
        emitter: &EventEmitter,
        cancellation: &CancellationToken,
    ) {
        let aspect_ratio = plan.settings.aspect_ratio;
        let mut work = Vec::new();
        for unit in &mut plan.units {
            match unit.image.as_ref().map(|image| image.status.url()) {
                None => skip_pending(&mut unit.motion, "no primary asset"),
                Some(None) => skip_pending(&mut unit.motion, "primary asset unavailable"),
                Some(Some(url)) => {
                    let prompt = unit.animation.clone().unwrap_or_else(|| unit.prompt.clone());
                    work.push((
                        unit.index,
                        ProviderRequest::new(ProviderKind::Video, prompt)
                            .with_input_url(url)
                            .with_aspect_ratio(aspect_ratio),
                    ));
                }
            }
        }

        info!("Transforming {} unit(s)", work.len());
        let results = join_all(work.into_iter().map(|(index, request)| async move {
            let outcome = self
                .generate_asset(
                    route,
                    request,
                    index,
                    AssetStage::Motion,
                    emitter,
                    cancellation,
                )
                .await;
            (index, outcome)
        }))
        .await;

        for (index, outcome) in results {
            if let Some(unit) = plan.unit_mut(index)
                && let Err(e) = outcome.record(&mut unit.motion)
            {
                warn!("Unit {}: could not record motion outcome: {}", index, e);
            }
        }
    }

    /// Submit one asset job with retries and wait for its result.
    ///
    /// Cancellation is honored only before admission; an admitted job runs
    /// to completion so its result is recorded.
    async fn generate_asset(
        &self,
        route: &ProviderRoute,
        request: ProviderRequest,
        unit_index: usize,
        stage: AssetStage,
        emitter: &EventEmitter,
        cancellation: &CancellationToken,
    ) -> AssetOutcome {
        let key = route.client.key().clone();
        let poller = JobPoller::new(route.poll);
        let max_attempts = self.params.max_attempts();
        let mut job = Job::new(key.clone(), request).for_unit(unit_index);

        loop {
            let admitted = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    debug!("Unit {} {}: {}", unit_index, stage, CANCELLED_BEFORE_ADMISSION);
                    return AssetOutcome::Skipped(CANCELLED_BEFORE_ADMISSION.to_string());
                }
                permit = self.queue.acquire(&key) => permit,
            };
            let permit = match admitted {
                Ok(permit) => permit,
                Err(e) => return AssetOutcome::Failed(e.to_string()),
            };

            emitter
                .emit(ProgressEvent::UnitAssetStart {
                    unit_index,
                    stage,
                    attempt: job.attempt,
                })
                .await;
            let attempt = self
                .run_job(route, &poller, &mut job, stage, emitter)
                .await;
            drop(permit);

            let error = match attempt {
                Ok(url) => {
                    emitter
                        .emit(ProgressEvent::UnitAssetComplete {
                            unit_index,
                            stage,
                            url: url.clone(),
                        })
                        .await;
                    return AssetOutcome::Completed(url);
                }
                Err(error) => error,
            };

            let will_retry =
                error.retryable && job.attempt < max_attempts && !cancellation.is_cancelled();
            warn!(
                "Unit {} {} attempt {}/{} failed: {}{}",
                unit_index,
                stage,
                job.attempt,
                max_attempts,
                error.message,
                if will_retry { ", retrying" } else { "" }
            );
            emitter
                .emit(ProgressEvent::UnitAssetError {
                    unit_index,
                    stage,
                    error: error.message.clone(),
                    will_retry,
                })
                .await;
            if !will_retry {
                return AssetOutcome::Failed(error.message);
            }
            job = job.retry();
        }
    }

    /// One submission plus, for queued jobs, the wait for its result.
    async fn run_job(
        &self,
        route: &ProviderRoute,
        poller: &JobPoller,
        job: &mut Job,
        stage: AssetStage,
        emitter: &EventEmitter,
    ) -> Result<String, AttemptError> {
        let client = route.client.as_ref();
        let unit_index = job.unit_index.unwrap_or_default();

        match client.submit(&job.request).await {
            Ok(Submission::Completed { result_url }) => {
                if let Err(e) = job.complete(result_url.clone()) {
                    warn!("Could not record result of job {}: {}", job.id, e);
                }
                Ok(result_url)
            }
            Ok(Submission::Queued { job_id }) => {
                debug!("Job {} queued as {} on {}", job.id, job_id, job.provider);
                if let Err(e) = job.mark_queued(job_id) {
                    warn!("Could not record queued job {}: {}", job.id, e);
                }
                poller
                    .track(client, job, |progress| {
                        emitter.try_emit(ProgressEvent::UnitAssetProgress {
                            unit_index,
                            stage,
                            progress,
                        })
                    })
                    .await
                    .map_err(|e| AttemptError {
                        retryable: e.is_retryable(),
                        message: e.to_string(),
                    })
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(err) = job.fail(message.clone()) {
                    warn!("Could not record failure of job {}: {}", job.id, err);
                }
                Err(AttemptError {
                    retryable: e.is_transient(),
                    message,
                })
            }
        }
    }

    async fn assemble(
        &self,
        run_id: &RunId,
        plan: GenerationPlan,
        brief: String,
        snapshot: &mut RunSnapshot,
        emitter: &EventEmitter,
    ) -> Result<PipelineReport, PipelineError> {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut warnings = Vec::new();
        for unit in &plan.units {
            if !unit.is_assembly_eligible() {
                failed.push(UnitFailure {
                    unit_index: unit.index,
                    stage: AssetStage::Image,
                    error: primary_failure(unit),
                });
                continue;
            }
            succeeded.push(unit.index);
            if let Some(error) = unit.motion.error() {
                warnings.push(UnitFailure {
                    unit_index: unit.index,
                    stage: AssetStage::Motion,
                    error: error.to_string(),
                });
            }
            if let Some(error) = unit.narration_audio.error() {
                warnings.push(UnitFailure {
                    unit_index: unit.index,
                    stage: AssetStage::Narration,
                    error: error.to_string(),
                });
            }
        }

        if succeeded.is_empty() {
            let error = PipelineError::NoUsableUnits {
                failed: failed.len(),
            };
            return Err(self.abort(snapshot, Some(&plan), error, emitter).await);
        }

        let mut segments: Vec<Segment> = plan
            .units
            .iter()
            .filter(|u| u.is_assembly_eligible())
            .map(segment)
            .collect();
        segments.sort_by_key(|s| s.unit_index);

        let request = AssemblyRequest {
            run_id: run_id.clone(),
            theme: plan.theme.clone(),
            brief: brief.clone(),
            settings: plan.settings.clone(),
            segments,
        };
        let (artifact_url, assembly_error) = match self.assembler.assemble(&request).await {
            Ok(url) => (Some(url), None),
            Err(e) => {
                warn!("Assembly of run {} failed: {}", run_id, e);
                (None, Some(e.to_string()))
            }
        };

        snapshot.artifact_url = artifact_url.clone();
        snapshot.error = assembly_error.clone();
        snapshot.record(RunPhase::Completed, Some(&plan));
        self.persist(snapshot).await;

        info!(
            "Run {} complete: {} unit(s) assembled, {} failed, {} warning(s)",
            run_id,
            succeeded.len(),
            failed.len(),
            warnings.len()
        );
        emitter
            .emit(ProgressEvent::Complete {
                artifact_url: artifact_url.clone(),
                succeeded: succeeded.clone(),
                failed: failed.clone(),
                warnings: warnings.clone(),
            })
            .await;

        Ok(PipelineReport {
            run_id: run_id.clone(),
            artifact_url,
            succeeded,
            failed,
            warnings,
            assembly_error,
            plan,
            brief,
        })
    }

    async fn enter(
        &self,
        phase: PipelinePhase,
        snapshot: &mut RunSnapshot,
        plan: Option<&GenerationPlan>,
        emitter: &EventEmitter,
    ) {
        info!("Phase {}: {}", phase.number(), phase.as_str());
        snapshot.record(phase.into(), plan);
        self.persist(snapshot).await;
        emitter.emit(ProgressEvent::Phase { name: phase }).await;
    }

    async fn cancelled(
        &self,
        snapshot: &mut RunSnapshot,
        plan: Option<&GenerationPlan>,
        emitter: &EventEmitter,
    ) -> PipelineError {
        let error = PipelineError::Cancelled;
        info!("Run {} cancelled during {}", snapshot.run_id, snapshot.phase);
        snapshot.record(RunPhase::Cancelled, plan);
        self.persist(snapshot).await;
        emitter
            .emit(ProgressEvent::Error {
                message: error.to_string(),
            })
            .await;
        error
    }

    async fn abort(
        &self,
        snapshot: &mut RunSnapshot,
        plan: Option<&GenerationPlan>,
        error: PipelineError,
        emitter: &EventEmitter,
    ) -> PipelineError {
        warn!("Run {} failed: {}", snapshot.run_id, error);
        if plan.is_some() {
            snapshot.record(snapshot.phase, plan);
        }
        snapshot.fail(error.to_string());
        self.persist(snapshot).await;
        emitter
            .emit(ProgressEvent::Error {
                message: error.to_string(),
            })
            .await;
        error
    }

    async fn persist(&self, snapshot: &RunSnapshot) {
        if let Err(e) = self.store.save(snapshot).await {
            warn!("Could not persist run {}: {}", snapshot.run_id, e);
        }
    }
}

fn skip_pending(status: &mut AssetStatus, reason: &str) {
    if *status == AssetStatus::Pending {
        *status = AssetStatus::Skipped {
            reason: reason.to_string(),
        };
    }
}

fn primary_failure(unit: &Unit) -> String {
    match unit.primary_status() {
        Some(AssetStatus::Failed { error }) => error.clone(),
        Some(AssetStatus::Skipped { reason }) => reason.clone(),
        _ => "primary asset not generated".to_string(),
    }
}

fn segment(unit: &Unit) -> Segment {
    let mut flags = Vec::new();
    if unit.motion.error().is_some() {
        flags.push("motion_failed".to_string());
    }
    if unit.narration_audio.error().is_some() {
        flags.push("narration_failed".to_string());
    }
    Segment {
        unit_index: unit.index,
        title: unit.title.clone(),
        image_url: unit.primary_url().map(str::to_string),
        video_url: unit.motion.url().map(str::to_string),
        audio_url: unit.narration_audio.url().map(str::to_string),
        subtitle: unit.narration.clone(),
        chart: unit
            .chart
            .as_ref()
            .and_then(|chart| serde_json::to_value(chart).ok()),
        flags,
    }
}
