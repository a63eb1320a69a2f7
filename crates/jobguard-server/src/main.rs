//! JobGuard server binary
//!
//! Loads the fine-tuned classifier once at startup, then serves predictions
//! over HTTP.

use anyhow::Result;
use clap::Parser;
use jobguard_classifier::{BlockingPredictor, ModelProvider};
use jobguard_server::provision::{provision, ProvisionOutcome};
use jobguard_server::{build_app, run_server, AppState, Cli, Commands, ServerConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let mut config = ServerConfig::load(&cli.config)?;

    match cli.command() {
        Commands::Fetch(args) => {
            config.apply_model_args(&args);
            match run_provisioning(&config).await? {
                ProvisionOutcome::AlreadyPresent => {
                    info!("Model directory {} already populated", config.model.dir.display())
                }
                ProvisionOutcome::NotConfigured => {
                    anyhow::bail!("No model.hf_repo configured, nothing to fetch")
                }
                ProvisionOutcome::Downloaded(files) => {
                    info!("Fetched {} files into {}", files.len(), config.model.dir.display())
                }
            }
        }

        Commands::Serve(args) => {
            config.apply_serve_args(&args);
            serve(config).await?;
        }
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> Result<()> {
    info!("Starting JobGuard");

    let metrics_handle = init_metrics()?;

    run_provisioning(&config).await?;

    let options = config.model.options()?;
    let model_dir = config.model.dir.clone();
    let model = tokio::task::spawn_blocking(move || ModelProvider::new(options).load(model_dir))
        .await??;

    let workers = config.inference.workers();
    info!(
        "Model '{}' ready ({}, max_length {}), {} inference workers",
        model.name(),
        model.architecture().as_str(),
        model.max_length(),
        workers
    );

    let predictor = BlockingPredictor::new(model.into_pipeline(), workers);
    let state = AppState::new(Arc::new(predictor))
        .with_metrics(metrics_handle)
        .with_timeout(config.inference.timeout());

    let app = build_app(state, config.http.max_body_bytes);
    run_server(app, config.socket_addr()?).await
}

/// hf-hub downloads block, keep them off the reactor
async fn run_provisioning(config: &ServerConfig) -> Result<ProvisionOutcome> {
    let model_config = config.model.clone();
    tokio::task::spawn_blocking(move || provision(&model_config)).await?
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("jobguard=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("jobguard=info,tower_http=warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "jobguard_requests_total",
        "Total number of prediction requests by response format"
    );
    metrics::describe_counter!(
        "jobguard_predictions_total",
        "Total number of completed predictions by label"
    );
    metrics::describe_counter!("jobguard_errors_total", "Total number of errors by kind");
    metrics::describe_histogram!(
        "jobguard_inference_latency_us",
        metrics::Unit::Microseconds,
        "Prediction latency in microseconds, including the wait for a worker"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
