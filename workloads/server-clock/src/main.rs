//! SSR Server Clock - HTTP server entry point.
//!
//! Loads configuration, starts the region health probe and serves the
//! router until Ctrl-C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use edge_core::AppConfig;
use edge_observability::{init_tracing, LogFormat, DEFAULT_FILTER};
use server_clock::{build_router, AppState};

/// SSR Server Clock - multi-region server-rendered workload
#[derive(Parser)]
#[command(name = "server-clock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (TOML, or JSON with a .json extension)
    #[arg(short, long, env = "SERVER_CLOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overriding the config file and BIND_ADDR
    #[arg(long)]
    bind: Option<String>,

    /// Log output format: json or human
    #[arg(long)]
    log_format: Option<String>,

    /// Healthy primary checks required before failing back
    #[arg(long)]
    failback_threshold: Option<u32>,

    /// Seconds between health checks
    #[arg(long)]
    health_check_interval: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(threshold) = self.failback_threshold {
            config.failback_threshold = threshold;
        }
        if let Some(interval) = self.health_check_interval {
            config.health_check_interval_seconds = interval;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    // Validated once, after every override source.
    config.validate().context("Invalid configuration")?;

    let format: LogFormat = config
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_tracing(format, DEFAULT_FILTER).context("Failed to initialize logging")?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config).await?;

    // Seed the registry before taking traffic.
    state.probe.check_now().await;
    let probe = state.probe.clone().spawn();

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "Starting SSR Server Clock");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    probe.shutdown().await;
    served.context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
