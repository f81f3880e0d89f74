use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use sentinel_monitor::build_monitor;
use sentinel_monitor::utils::logging::init_logging;
use sentinel_operator::{api, config::OperatorConfig, AppState};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Operator control surface for the safety monitor", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/operator.yaml")]
    config: String,

    /// Log level, overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = OperatorConfig::load(&args.config).context("loading operator configuration")?;
    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.monitor.logging.level);
    init_logging(level)?;

    // Start the embedded monitor
    let (engine, handle) = build_monitor(&config.monitor).await?;
    let runner = tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            error!("Monitor loop failed: {}", e);
        }
    });

    if config.server.autostart {
        handle.start().await?;
    }

    // Create app state
    let app_state = web::Data::new(AppState::new(handle.clone()));
    let origins = config.server.cors_origins.clone();

    // Start HTTP server
    let server = HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT"])
            .allowed_headers(vec!["Content-Type"])
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .configure(api::configure)
    })
    .bind((config.server.host.clone(), config.server.port))?
    .run();

    info!(
        "Operator server for {} started on {}:{}",
        config.monitor.node_id, config.server.host, config.server.port
    );

    server.await?;

    info!("Server stopped, shutting down monitor");
    handle.shutdown().await?;
    runner.await.context("monitor task panicked")?;
    Ok(())
}
