//! Toxiguard Gateway
//!
//! Serves a multi-label text classifier over HTTP with API key
//! authentication and per-client fixed-window rate limiting.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use toxiguard_classifiers::{load_model, ClassifierEngine};
use toxiguard_gateway::{create_router, AppState, GatewayConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "toxiguard-gateway")]
#[command(about = "Toxiguard classification gateway", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml", env = "TOXIGUARD_CONFIG")]
    config: String,

    /// Model artifact path (overrides the configuration file)
    #[arg(short, long, env = "TOXIGUARD_MODEL")]
    model: Option<String>,

    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0")]
    listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "8000")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting Toxiguard Gateway");

    let mut config = GatewayConfig::load(&cli.config)?;
    if let Some(model) = &cli.model {
        config.model_path = model.clone();
    }
    info!("Configuration loaded successfully");
    info!("Model: {}", config.model_path);
    info!("API key header: {}", config.api_key_header);

    let metrics_handle = init_metrics()?;

    // A failed load leaves the gateway serving ModelUnavailable until restart
    let engine = ClassifierEngine::from_load_result(
        load_model(&config.model_path),
        config.scoring_workers,
    );
    if !engine.is_loaded() {
        warn!("Serving without a model; prediction requests will fail");
    }

    let state = AppState::new(config, engine, Some(metrics_handle))?;

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("toxiguard_gateway=debug,toxiguard_classifiers=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("toxiguard_gateway=info,toxiguard_classifiers=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "toxiguard_requests_total",
        "Total number of prediction requests received by endpoint"
    );
    metrics::describe_counter!(
        "toxiguard_rejections_total",
        "Total number of failed requests by reason"
    );
    metrics::describe_counter!(
        "toxiguard_texts_scored_total",
        "Total number of texts scored"
    );
    metrics::describe_histogram!(
        "toxiguard_scoring_latency_us",
        metrics::Unit::Microseconds,
        "Scoring latency in microseconds per request"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
