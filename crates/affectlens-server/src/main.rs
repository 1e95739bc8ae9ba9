//! affectlens server
//!
//! Serves sentiment, emotion, aspect and risk analysis over HTTP. Analyzers
//! load in the background; `/ready` reports when they can take traffic.

use affectlens_classifiers::{readiness_channel, Analyzers};
use affectlens_server::{create_router, AppState, ServerConfig};
use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// How often idle rate-limit state is purged
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "affectlens-server")]
#[command(about = "Sentiment, emotion and risk analysis API", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AFFECTLENS_CONFIG", default_value = "affectlens.yaml")]
    config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long, env = "AFFECTLENS_LISTEN")]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "AFFECTLENS_PORT")]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    info!("Starting affectlens server");

    let config =
        ServerConfig::load(&cli.config)?.with_overrides(cli.listen.as_deref(), cli.port);
    info!(path = %cli.config.display(), "Configuration loaded");

    let metrics_handle = init_metrics()?;

    let (readiness_tx, readiness_rx) = readiness_channel();
    let state = AppState::new(&config, readiness_rx, Some(metrics_handle))?;

    // Analyzers load in the background so health checks answer immediately
    let (failed_tx, failed_rx) = oneshot::channel::<String>();
    let failure = Arc::new(Mutex::new(None));
    {
        let state = state.clone();
        let analyzers = config.analyzers.clone();
        let failure = failure.clone();
        tokio::spawn(async move {
            match Analyzers::initialize(&analyzers, &readiness_tx).await {
                Ok(ready) => {
                    state.install(ready.service);
                    info!(readiness = ?ready.readiness, "Analyzers ready");
                }
                Err(e) => {
                    error!(error = %e, "Analyzer initialization failed");
                    *failure.lock() = Some(e.to_string());
                    let _ = failed_tx.send(e.to_string());
                }
            }
        });
    }

    {
        let limiters = state.limiters.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                limiters.retain_recent();
            }
        });
    }

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        tokio::select! {
            _ = shutdown_signal() => warn!("Shutdown signal received, stopping server..."),
            Ok(reason) = failed_rx => warn!(%reason, "Stopping server after failed initialization"),
        }
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    if let Some(reason) = failure.lock().take() {
        anyhow::bail!("analyzers failed to initialize: {}", reason);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
}

/// `AFFECTLENS_LOG`, then `RUST_LOG`, then `affectlens=info`
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("affectlens=debug")
    } else {
        EnvFilter::try_from_env("AFFECTLENS_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("affectlens=info"))
    };

    let (json_layer, plain_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .init();
}

/// Install the Prometheus recorder and return its render handle
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "affectlens_requests_total",
        "Total number of API requests by endpoint"
    );
    metrics::describe_counter!(
        "affectlens_cache_hits_total",
        "Analysis cache hits by kind"
    );
    metrics::describe_counter!(
        "affectlens_cache_misses_total",
        "Analysis cache misses by kind"
    );
    metrics::describe_counter!(
        "affectlens_risk_flags_total",
        "Risk flags raised by category"
    );
    metrics::describe_counter!(
        "affectlens_bulk_items_total",
        "Bulk items processed by outcome"
    );
    metrics::describe_counter!(
        "affectlens_rate_limited_total",
        "Requests rejected by the rate limiter"
    );
    metrics::describe_counter!("affectlens_errors_total", "Total number of errors by type");
    metrics::describe_histogram!(
        "affectlens_inference_latency_us",
        metrics::Unit::Microseconds,
        "Inference provider latency in microseconds by task"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
