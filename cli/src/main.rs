//! CLI entrypoint for atelier
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use atelier_application::{
    ConversationLogger, GenerationPipeline, InMemoryRunStore, LlmGateway, NoConversationLogger,
    PlanGenerationUseCase, ProviderRoute, ProviderRoutes, RateLimitedQueue, RunLauncher,
    RunStore, SearchProvider,
};
use atelier_domain::{ProviderKind, RunId};
use atelier_infrastructure::{
    ApiKeyCache, ConfigLoader, ConfigValidationError, DEFAULT_KEY_TTL, DuckDuckGoSearch,
    FileConfig, FileOutputFormat, FileProviderConfig, HttpProviderClient, HttpProviderConfig,
    JsonFileRunStore, JsonlConversationLogger, ManifestAssembler, OpenAiCompatConfig,
    OpenAiCompatGateway,
};
use atelier_presentation::{
    Cli, ConsoleFormatter, NoProgress, OutputFormat, ProgressRenderer, ProgressReporter,
    drain_events,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?
    };

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, &config);

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("config: {}", issue);
        }
        bail!("invalid configuration ({} issue(s))", issues.len());
    }

    if !config.output.color {
        colored::control::set_override(false);
    }

    let Some(request) = cli.request() else {
        bail!("A goal is required. Run `atelier --help` for usage.");
    };

    let output = cli.output.unwrap_or(match config.output.format {
        Some(FileOutputFormat::Json) => OutputFormat::Json,
        _ => OutputFormat::Text,
    });

    // === Dependency Injection ===
    let run_id = RunId::generate();
    let pipeline = build_pipeline(&cli, &config, &run_id)?;
    let launcher = RunLauncher::new(Arc::new(pipeline));

    let cancel = CancellationToken::new();
    let handle = launcher.submit_as(run_id, request, cancel.clone())?;
    info!(run_id = %handle.run_id, "Run submitted");

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no new provider jobs will be started");
            cancel.cancel();
        }
    });

    let renderer: Box<dyn ProgressRenderer> = if cli.quiet || output == OutputFormat::Json {
        Box::new(NoProgress)
    } else if cli.verbose > 0 {
        Box::new(ProgressReporter::verbose())
    } else {
        Box::new(ProgressReporter::new())
    };
    drain_events(handle.events, renderer.as_ref()).await;

    match handle.join.await.context("run task panicked")? {
        Ok(report) => {
            let rendered = match output {
                OutputFormat::Text => ConsoleFormatter::format(&report),
                OutputFormat::Json => ConsoleFormatter::format_json(&report),
            };
            println!("{}", rendered);
            Ok(())
        }
        Err(error) => {
            eprintln!("{}", ConsoleFormatter::format_error(&error));
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8, config: &FileConfig) -> Option<WorkerGuard> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    match &config.logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "atelier.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("info"));
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}

fn build_pipeline(cli: &Cli, config: &FileConfig, run_id: &RunId) -> Result<GenerationPipeline> {
    let keys = Arc::new(ApiKeyCache::new(DEFAULT_KEY_TTL));

    // Planner
    let gateway: Arc<dyn LlmGateway> = Arc::new(OpenAiCompatGateway::new(
        OpenAiCompatConfig::from_file(&config.reasoning),
        keys.clone(),
    )?);

    let mut params = config.agent.to_planner_params();
    if let Some(max) = cli.max_iterations {
        params = params.with_max_iterations(max);
    }

    let mut planner = PlanGenerationUseCase::new(gateway, params);
    if config.agent.web_search {
        let search: Arc<dyn SearchProvider> = Arc::new(DuckDuckGoSearch::new(
            config.search.base_url.clone(),
            Duration::from_millis(config.search.timeout_ms),
        )?);
        planner = planner.with_search(search);
    }

    let logger: Arc<dyn ConversationLogger> = if config.logging.conversation_log {
        match JsonlConversationLogger::for_run(config.output.runs_dir(), run_id) {
            Some(logger) => {
                info!(path = %logger.path().display(), "Writing planner transcript");
                Arc::new(logger)
            }
            None => Arc::new(NoConversationLogger),
        }
    } else {
        Arc::new(NoConversationLogger)
    };
    planner = planner.with_conversation_logger(logger);

    // Generation providers
    let Some(image) = &config.providers.image else {
        bail!(ConfigValidationError::MissingImageProvider);
    };
    let mut routes = ProviderRoutes::new(provider_route(ProviderKind::Image, image, &keys)?);
    if let Some(video) = &config.providers.video {
        routes = routes.with_video(provider_route(ProviderKind::Video, video, &keys)?);
    }
    if let Some(speech) = &config.providers.speech {
        routes = routes.with_speech(provider_route(ProviderKind::Speech, speech, &keys)?);
    }

    let (default_policy, policies) = config.rate_limits.to_policies()?;
    let queue = RateLimitedQueue::with_policies(default_policy, policies);

    let store: Arc<dyn RunStore> = if cli.no_persist {
        Arc::new(InMemoryRunStore::new())
    } else {
        Arc::new(JsonFileRunStore::new(config.output.runs_dir()))
    };
    let assembler = Arc::new(ManifestAssembler::new(config.output.artifacts_dir()));

    Ok(
        GenerationPipeline::new(planner, routes, queue, assembler, store)
            .with_params(config.pipeline.to_pipeline_params()),
    )
}

fn provider_route(
    kind: ProviderKind,
    file: &FileProviderConfig,
    keys: &Arc<ApiKeyCache>,
) -> Result<ProviderRoute> {
    let client = HttpProviderClient::new(HttpProviderConfig::from_file(kind, file), keys.clone())?;
    info!(kind = %kind, key = %file.key(), "Provider configured");
    Ok(ProviderRoute::new(Arc::new(client), file.poll_policy()))
}
