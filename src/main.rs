use std::sync::Arc;

use tracing::{error, info};

use files_manager::file::FileStorage;
use files_manager::web::{AppState, WebServer};
use files_manager::worker::{ThumbnailQueue, ThumbnailWorker};
use files_manager::{cache, Config, Database};

#[tokio::main]
async fn main() {
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = files_manager::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        files_manager::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> files_manager::Result<()> {
    config.validate()?;
    info!("files-manager starting");

    let db = Arc::new(Database::open(&config.database.path, config.database.max_connections).await?);
    let kv = cache::connect(&config.cache).await?;
    let storage = FileStorage::new(&config.files.storage_path);
    info!("File storage at {}", config.files.storage_path);

    let (queue, jobs) = ThumbnailQueue::new(config.worker.max_attempts);
    let worker = ThumbnailWorker::new(db.pool().clone(), config.worker.concurrency)
        .spawn(queue.clone(), jobs);

    let state = Arc::new(AppState::new(db.clone(), kv.clone(), storage, queue.clone()));
    let server = WebServer::new(&config.server, state)?;

    server.run_until(shutdown_signal()).await?;

    info!("Shutting down");
    queue.close();
    worker.shutdown().await;
    kv.close().await;
    db.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
