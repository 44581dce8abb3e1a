//! witmon - witness node monitoring and feed publication daemon.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Witness node monitoring and price-feed publication daemon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via WITMON_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    witmon_telemetry::init_logging()?;

    info!("Starting witmon v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > WITMON_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("WITMON_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = witmon_daemon::AppConfig::from_file(&config_path)?;
    info!(
        nodes = config.nodes.len(),
        feeds = config.feeds.is_some(),
        "Configuration loaded"
    );

    let app = witmon_daemon::Application::new(config)?;
    app.run().await?;

    Ok(())
}
