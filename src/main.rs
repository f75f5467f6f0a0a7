// src/main.rs - Bridge binary: config, wiring, lifecycle
use clap::Parser;
use printlink::cloud::{CloudBridge, register_device};
use printlink::config::Config;
use printlink::file_manager::{LocalStorage, prepare_gcode_folder};
use printlink::simulator::SimulatedPrinter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "printlink", about = "Printer-to-server sync bridge")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(default_value = "printlink.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting printlink bridge");

    let cli = Cli::parse();
    let config = Config::load(&cli.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", cli.config.display(), e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    tracing::info!(
        "Device: {} ({:?} environment)",
        config.bridge.device_id,
        config.bridge.environment
    );
    tracing::info!("Server: {}", config.bridge.server_url());

    let storage = Arc::new(LocalStorage::new(config.storage.data_dir.clone()));
    let gcode_folder = prepare_gcode_folder(&*storage, &config.storage.gcode_folder).await?;

    let printer = Arc::new(SimulatedPrinter::new());

    let http = reqwest::Client::new();
    register_device(&http, &config.bridge).await;

    let bridge = Arc::new(CloudBridge::new(
        config,
        printer.clone(),
        storage,
        gcode_folder,
    ));
    bridge.start();

    // Adapter from the host's event feed onto the bridge's event port.
    let mut events = printer.subscribe();
    let event_bridge = bridge.clone();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok((kind, data)) => event_bridge.on_printer_event(kind, data).await,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("event feed lagged, {missed} events lost");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    bridge.shutdown().await;

    Ok(())
}
