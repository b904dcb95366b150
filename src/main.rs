use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use competency_ai::config::{AppConfig, PipelineConfig};
use competency_ai::error::AppError;
use competency_ai::telemetry;
use competency_ai::workflows::competency::{
    competency_router, CancellationFlag, CompetencyPipeline, CompetencyService, DiceOracle,
    LibraryKind, MemorySnapshotStore, PipelineMaterials, PipelineRunner, ReferenceStore,
    ResilientOracle, RetryPolicy, RunReport,
};
use competency_ai::workflows::intake::{
    IntakeWarning, JobImporter, LibraryImporter, ReferenceImporter,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Competency Architecture Orchestrator",
    about = "Run the competency mapping pipeline and its service surface from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run or inspect competency pipeline executions
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommand,
    },
    /// Query the benchmarking reference store
    Reference {
        #[command(subcommand)]
        command: ReferenceCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum PipelineCommand {
    /// Run the full pipeline over CSV inputs
    Run(PipelineRunArgs),
    /// Summarize a previously saved run report
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct PipelineRunArgs {
    /// Job descriptions CSV (Job Title, Job Family, Job Level, Summary, Responsibilities)
    #[arg(long)]
    jobs: PathBuf,
    /// Technical competency library CSV
    #[arg(long)]
    technical: PathBuf,
    /// Leadership/core competency library CSV (overlap reference)
    #[arg(long)]
    leadership: PathBuf,
    /// Optional reference-document CSV for benchmarking
    #[arg(long)]
    references: Option<PathBuf>,
    /// Number of competencies to select per job (6..=10)
    #[arg(long)]
    top_n: Option<usize>,
    /// Downgrade blocking Error rules to warnings
    #[arg(long)]
    lenient: bool,
    /// Write the full run document to this JSON file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Run document produced by `pipeline run --output`
    #[arg(long)]
    report: PathBuf,
}

#[derive(Subcommand, Debug)]
enum ReferenceCommand {
    /// Search reference documents by keyword overlap
    Search(ReferenceSearchArgs),
}

#[derive(Args, Debug)]
struct ReferenceSearchArgs {
    /// Reference-document CSV to search
    #[arg(long)]
    references: PathBuf,
    /// Query text
    #[arg(long)]
    query: String,
}

/// On-disk run document written by `pipeline run` and read by `inspect`.
#[derive(Debug, Serialize, Deserialize)]
struct RunDocument {
    intake_warnings: Vec<IntakeWarning>,
    report: RunReport,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Pipeline {
            command: PipelineCommand::Run(args),
        } => run_pipeline(args).await,
        Command::Pipeline {
            command: PipelineCommand::Inspect(args),
        } => inspect_run(args),
        Command::Reference {
            command: ReferenceCommand::Search(args),
        } => search_references(args),
    }
}

fn build_runner(config: PipelineConfig) -> PipelineRunner {
    let oracle = Arc::new(ResilientOracle::new(DiceOracle, RetryPolicy::default()));
    let store = Arc::new(MemorySnapshotStore::default());
    let pipeline = Arc::new(CompetencyPipeline::new(oracle, config, store));
    PipelineRunner::new(pipeline)
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let runner = build_runner(config.pipeline.clone());
    let service = Arc::new(CompetencyService::new(runner, ReferenceStore::default()));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(competency_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "competency orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_pipeline(args: PipelineRunArgs) -> Result<(), AppError> {
    let app_config = AppConfig::load()?;
    let mut pipeline_config = app_config.pipeline;
    if let Some(top_n) = args.top_n {
        pipeline_config = pipeline_config.with_top_n(top_n)?;
    }
    if args.lenient {
        pipeline_config.lenient = true;
    }

    let intake = JobImporter::from_path(&args.jobs)?;
    let technical = LibraryImporter::from_path(&args.technical, LibraryKind::Technical)?;
    let leadership = LibraryImporter::from_path(&args.leadership, LibraryKind::Leadership)?;
    let references = match &args.references {
        Some(path) => ReferenceImporter::from_path(path)?,
        None => ReferenceStore::default(),
    };

    let runner = build_runner(pipeline_config);
    let report = runner
        .run(
            intake.jobs,
            PipelineMaterials {
                technical,
                leadership,
                references,
            },
            CancellationFlag::default(),
        )
        .await?;

    let document = RunDocument {
        intake_warnings: intake.warnings,
        report,
    };

    if let Some(path) = &args.output {
        let payload = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, payload)?;
        println!("Run document written to {}", path.display());
    }

    render_run_document(&document);

    if !document.report.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn inspect_run(args: InspectArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.report)?;
    let document: RunDocument = serde_json::from_str(&raw)?;
    render_run_document(&document);
    Ok(())
}

fn search_references(args: ReferenceSearchArgs) -> Result<(), AppError> {
    let store = ReferenceImporter::from_path(&args.references)?;
    let matches = store.search(&args.query);

    if matches.is_empty() {
        println!("No reference documents matched '{}'", args.query);
        return Ok(());
    }

    println!("Reference documents matching '{}'", args.query);
    for document in matches {
        println!("- {} | {} | tags: {}", document.doc_id, document.title, document.tags.join(", "));
    }
    Ok(())
}

fn render_run_document(document: &RunDocument) {
    let report = &document.report;
    println!("Run {} -> {}", report.run_id, report.state.label());

    if !document.intake_warnings.is_empty() {
        println!("\nExtraction warnings");
        for warning in &document.intake_warnings {
            println!(
                "- [{}] row {}: {}",
                warning.severity.label(),
                warning.row,
                warning.detail
            );
        }
    }

    println!("\nJobs");
    for job in &report.jobs {
        println!(
            "- {} ({}): {}, {} competencies selected{}",
            job.job_title,
            job.job_id.0,
            job.final_stage.label(),
            job.ranked.len(),
            job.coverage
                .as_ref()
                .map(|coverage| {
                    format!(
                        ", coverage {:.0}% ({} of {} responsibilities)",
                        coverage.coverage_rate * 100.0,
                        coverage.covered_responsibilities,
                        coverage.total_responsibilities
                    )
                })
                .unwrap_or_default()
        );
        for entry in &job.ranked {
            println!(
                "    #{} {} (criticality {:.2})",
                entry.rank, entry.competency.name, entry.criticality_score
            );
        }
    }

    for job in &report.jobs {
        let blocking = job.blocking_flags();
        if !blocking.is_empty() {
            println!("\nBlocking flags for {}", job.job_id.0);
            for flag in blocking {
                println!("- [{}] {}: {}", flag.severity.label(), flag.code, flag.detail);
            }
        }
    }

    if !report.skipped_jobs.is_empty() {
        println!("\nSkipped jobs (cancelled before dispatch)");
        for job_id in &report.skipped_jobs {
            println!("- {}", job_id.0);
        }
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
