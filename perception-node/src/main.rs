use anyhow::Context;
use clap::Parser;
use sentinel_monitor::utils::logging::init_logging;
use sentinel_monitor::{build_monitor, MonitorConfig};
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless multi-camera safety monitor", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/monitor.yaml")]
    config: String,

    /// Log level, overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Use the simulated gateway and synthetic frames
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = MonitorConfig::load(&args.config).context("loading monitor configuration")?;
    if args.simulate {
        config.gateway.simulated = true;
    }

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level)?;

    info!("Starting Sentinel monitor {}", config.node_id);

    // Start the monitor loop
    let (engine, handle) = build_monitor(&config).await?;
    let runner = tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            error!("Monitor loop failed: {}", e);
        }
    });

    handle.start().await?;

    // Wait for shutdown signal
    wait_for_shutdown().await;

    info!("Shutting down Sentinel monitor");
    handle.shutdown().await?;
    runner.await.context("monitor task panicked")?;
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
