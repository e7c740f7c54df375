//! CLI command definitions for housing-predictor.
//!
//! `serve` runs the HTTP API with the in-process pipeline; the other
//! commands operate on the store or run the job graph once.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{self, ApiHandler};
use crate::config::Settings;
use crate::metrics::init_metrics;
use crate::model::LinearModelAdapter;
use crate::pipeline::{local_pipeline, run_job_inline};
use crate::ports::{ModelPort, StoragePort};
use crate::service::PredictionService;
use crate::storage::{connect_storage, is_memory_url, PostgresStorage};

/// Default number of predictions printed by `list`.
const DEFAULT_LIST_LIMIT: i64 = 10;

/// Housing price prediction service.
#[derive(Parser)]
#[command(name = "housing-predictor")]
#[command(about = "Predict median house values through an asynchronous ETL pipeline")]
#[command(version)]
#[command(
    long_about = "housing-predictor accepts housing block features over HTTP, runs them through a\nclean/prepare/predict/store pipeline on a local worker pool, and serves the result by run id.\n\nExample usage:\n  MODEL_PATH=./model.json housing-predictor serve --port 8000"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the pipeline worker pool.
    Serve(ServeArgs),

    /// Apply database migrations.
    Migrate(MigrateArgs),

    /// Run the prediction job once on a JSON record file.
    Predict(PredictArgs),

    /// Print the most recent stored predictions.
    #[command(alias = "ls")]
    List(ListArgs),
}

/// Overrides shared by commands that touch the store.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Database URL; takes precedence over POSTGRES_*. Use memory:// for a throwaway store.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Arguments for `housing-predictor serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "API_HOST")]
    pub host: Option<String>,

    /// Port to bind.
    #[arg(short, long, env = "API_PORT")]
    pub port: Option<u16>,

    /// Path to the model artifact.
    #[arg(short, long, env = "MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Number of pipeline workers.
    #[arg(short, long, env = "PIPELINE_WORKERS")]
    pub workers: Option<usize>,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `housing-predictor migrate`.
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `housing-predictor predict`.
#[derive(Parser, Debug)]
pub struct PredictArgs {
    /// JSON file holding one housing record.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to the model artifact.
    #[arg(short, long, env = "MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Output the result as JSON.
    #[arg(short, long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `housing-predictor list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Maximum number of predictions to print.
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: i64,

    /// Output as JSON.
    #[arg(short, long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve(args) => run_serve_command(args).await,
        Commands::Migrate(args) => run_migrate_command(args).await,
        Commands::Predict(args) => run_predict_command(args).await,
        Commands::List(args) => run_list_command(args).await,
    }
}

fn load_settings(store: &StoreArgs) -> anyhow::Result<Settings> {
    let mut settings = Settings::from_env()?;
    if let Some(url) = &store.database_url {
        settings = settings.with_database_url(url.clone());
    }
    Ok(settings)
}

async fn load_model(settings: &Settings) -> anyhow::Result<Arc<dyn ModelPort>> {
    let path = settings.require_model_path()?;
    let model = LinearModelAdapter::new(path.clone());
    model.load_model().await?;
    info!(path = %path.display(), "Model loaded");
    Ok(Arc::new(model))
}

// ============================================================================
// serve
// ============================================================================

async fn run_serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.store)?;
    if let Some(host) = args.host {
        settings = settings.with_api_host(host);
    }
    if let Some(port) = args.port {
        settings = settings.with_api_port(port);
    }
    if let Some(model) = args.model {
        settings = settings.with_model_path(model);
    }
    if let Some(workers) = args.workers {
        settings = settings.with_pipeline_workers(workers);
    }
    settings.validate()?;

    init_metrics()?;

    let storage = connect_storage(&settings.database_url()).await?;
    let model = load_model(&settings).await?;

    let (etl, mut pool) = local_pipeline(settings.pipeline_config(), Arc::clone(&storage), model);
    pool.start()?;

    let service = PredictionService::new(Arc::new(etl), storage);
    let app = api::router(Arc::new(ApiHandler::new(Arc::new(service))));

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", address, e))?;
    info!(address = %address, workers = settings.pipeline_workers, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining worker pool");
    pool.shutdown().await?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ============================================================================
// migrate
// ============================================================================

async fn run_migrate_command(args: MigrateArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args.store)?;
    let url = settings.database_url();

    if is_memory_url(&url) {
        info!("In-memory store selected, nothing to migrate");
        return Ok(());
    }

    let storage = PostgresStorage::connect(&url).await?;
    let applied = storage.run_migrations().await?;
    println!("Applied {} migration(s)", applied);
    Ok(())
}

// ============================================================================
// predict
// ============================================================================

async fn run_predict_command(args: PredictArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.store)?;
    if let Some(model) = args.model {
        settings = settings.with_model_path(model);
    }

    let content = fs::read_to_string(&args.input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.input.display(), e))?;
    let raw: Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", args.input.display(), e))?;

    let storage = connect_storage(&settings.database_url()).await?;
    let model = load_model(&settings).await?;

    let result = run_job_inline(raw, storage, model).await?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&result)
            .map_err(|e| anyhow::anyhow!("Failed to serialize result: {}", e))?;
        println!("{}", json_output);
    } else {
        println!("Predicted median house value: {:.2}", result.prediction);
        println!("  run_id:    {}", result.run_id);
        println!("  record_id: {}", result.record_id);
    }
    Ok(())
}

// ============================================================================
// list
// ============================================================================

async fn run_list_command(args: ListArgs) -> anyhow::Result<()> {
    if args.limit <= 0 {
        anyhow::bail!("--limit must be positive");
    }

    let settings = load_settings(&args.store)?;
    let storage: Arc<dyn StoragePort> = connect_storage(&settings.database_url()).await?;
    let predictions = storage.list_predictions(args.limit).await?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&predictions)
            .map_err(|e| anyhow::anyhow!("Failed to serialize predictions: {}", e))?;
        println!("{}", json_output);
        return Ok(());
    }

    if predictions.is_empty() {
        println!("No predictions stored");
        return Ok(());
    }

    println!("{:<36}  {:>14}  {:<10}  CREATED", "RUN ID", "PREDICTION", "STATUS");
    for prediction in &predictions {
        println!(
            "{:<36}  {:>14.2}  {:<10}  {}",
            prediction.run_id.as_deref().unwrap_or("-"),
            prediction.value,
            prediction.status,
            prediction.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}
