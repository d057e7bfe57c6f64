use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use thermo_logging::init_logging;
use thermo_server::{create_router, metrics, AppConfig, AppState};
use thermo_shutdown::SignalHandler;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Thermo telemetry collector", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(Some(args.config.as_path())).context("invalid server configuration")?;
    init_logging(&config.logging)?;
    info!("Starting thermo collector with config: {}", args.config.display());

    if let Some(addr) = config.metrics_addr {
        metrics::init_metrics(addr)?;
    }

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let (signal_handler, _shutdown_rx) = SignalHandler::new();
    let waiter = signal_handler.clone();
    tokio::spawn(async move {
        if let Err(e) = waiter.wait_for_system_signal().await {
            error!("Failed to listen for shutdown signals: {}", e);
        }
    });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        retention = config.retention,
        freshness_window_secs = config.freshness_window_secs,
        "HTTP API listening on {}", addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(signal_handler.shutdown_future())
        .await?;

    info!("Collector stopped");
    Ok(())
}
