use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use newswire::feed::{
    ChannelHub, FeedFetcher, IngestCoordinator, IngestScheduler, Outbox, RetentionSweeper,
};
use newswire::web::{create_router, AppState};
use newswire::{Config, Database};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = newswire::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        newswire::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("newswire starting ({} source(s))", config.sources.len());

    let db = match Database::open(&config.database.path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let hub = Arc::new(ChannelHub::with_sources(
        config.sources.iter().map(|s| s.name.clone()),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let outbox = Outbox::spawn(hub.clone(), shutdown_rx);

    let fetcher = match FeedFetcher::new(&config.ingest) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create fetcher: {}", e);
            std::process::exit(1);
        }
    };

    let coordinator = Arc::new(IngestCoordinator::new(
        db.clone(),
        fetcher,
        outbox,
        config.sources.clone(),
    ));

    // Background ingestion
    let scheduler = IngestScheduler::new(
        coordinator.clone(),
        Duration::from_secs(config.ingest.interval_secs),
    );
    tokio::spawn(async move { scheduler.run().await });

    // Background retention sweep
    let sweeper = RetentionSweeper::new(
        db.clone(),
        config.ingest.retention_days,
        Duration::from_secs(config.ingest.retention_sweep_interval_secs),
    );
    tokio::spawn(async move { sweeper.run().await });

    // Web API
    let state = Arc::new(AppState::new(
        db,
        hub,
        coordinator,
        config.server.operator_token.clone(),
    ));
    let router = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = server.await {
        error!("Server error: {}", e);
    }
}
