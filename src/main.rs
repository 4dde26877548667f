use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, Level};

use territory_server::capture::coordinator::CaptureEngine;
use territory_server::capture::runtime::start_tick_loop;
use territory_server::config::ServerConfig;
use territory_server::metrics::{self, Metrics};
use territory_server::notify::LogSink;
use territory_server::reinforcement::spawner::RecordingSpawner;
use territory_server::zone::owner::StaticOwnerDirectory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Territory Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }
    info!(
        "Configuration loaded: tick {} ms, metrics port {}",
        config.tick_interval_ms, config.metrics_port
    );

    // Initialize metrics
    let metrics = Arc::new(Metrics::new());
    let metrics_clone = metrics.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    // The standalone binary runs with in-memory adapters; a host platform
    // replaces these with its own identity backend and unit factory.
    let platform = Arc::new(StaticOwnerDirectory::new());
    let spawner = Arc::new(RecordingSpawner::new());
    let notifier = Arc::new(LogSink);

    let engine = Arc::new(RwLock::new(CaptureEngine::new(platform, spawner, notifier)));

    let tick_task = start_tick_loop(engine.clone(), metrics.clone(), config.tick_interval_ms);
    info!("Server ready");

    // Shutdown signal handler
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Sessions are volatile: cancel everything, despawn reinforcements
    tick_task.abort();
    engine.write().await.shutdown();
    info!("Server stopped");

    Ok(())
}
