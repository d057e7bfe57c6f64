use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use thermo_device::{DeviceAgent, DeviceConfig, SensorMode};
use thermo_logging::init_logging;
use thermo_shutdown::SignalHandler;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Thermo device agent", long_about = None)]
struct Args {
    /// Config file path (TOML); missing file falls back to defaults and env
    #[arg(short, long, default_value = "device.toml")]
    config: PathBuf,

    /// Override the simulated sensor mode
    #[arg(long)]
    sensor: Option<SensorMode>,

    /// Send N historical readings (one minute apart) before sampling
    #[arg(long, value_name = "N")]
    backfill: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = DeviceConfig::load(Some(args.config.as_path())).context("invalid device configuration")?;
    if let Some(mode) = args.sensor {
        config.sensor.mode = mode;
    }

    init_logging(&config.logging)?;
    info!(
        device_id = %config.device_id,
        ingest_url = %config.ingest_url,
        sensor = ?config.sensor.mode,
        "Starting thermo device agent with config: {}",
        args.config.display()
    );

    let mut agent = DeviceAgent::from_config(&config).await?;

    if let Some(n) = args.backfill {
        agent.backfill(n).await;
    }

    let (signal_handler, shutdown_rx) = SignalHandler::new();
    let waiter = signal_handler.clone();
    tokio::spawn(async move {
        if let Err(e) = waiter.wait_for_system_signal().await {
            error!("Failed to listen for shutdown signals: {}", e);
        }
    });

    agent.run(shutdown_rx).await;
    Ok(())
}
