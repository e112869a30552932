//! filexfer server: chunked upload, merge and range-aware download over HTTP.
//!
//! Main entry point that wires the crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use filexfer_api::{AppState, build_router};
use filexfer_core::config::AppConfig;
use filexfer_core::error::AppError;
use filexfer_storage::{StorageManager, StorageRoot};

/// Command-line arguments. Flags override the loaded configuration.
#[derive(Debug, Parser)]
#[command(name = "filexfer-server", version, about = "Chunked file transfer server")]
struct Cli {
    /// Directory holding `default.toml` and `<env>.toml`
    #[arg(long, default_value = "config")]
    config: String,

    /// Configuration environment name
    #[arg(long, env = "FILEXFER_ENV", default_value = "development")]
    env: String,

    /// Storage root directory
    #[arg(long)]
    storage: Option<String>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration files and environment, then apply flag overrides
fn load_configuration(cli: &Cli) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load(&cli.config, &cli.env)?;

    if let Some(storage) = &cli.storage {
        config.storage.root_path.clone_from(storage);
    }
    if let Some(host) = &cli.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting filexfer v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Storage root ─────────────────────────────────────
    let root = Arc::new(StorageRoot::open(&config.storage.root_path).await?);
    tracing::info!(root = %root.path().display(), "Storage root ready");

    let storage = Arc::new(StorageManager::new(root, &config.upload));

    // ── Step 2: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 3: Session sweeper ──────────────────────────────────
    let sweeper = storage.sweeper().clone();
    let interval = Duration::from_secs(config.upload.sweep_interval_seconds);
    let ttl = Duration::from_secs(config.upload.session_ttl_seconds);
    let sweeper_handle = tokio::spawn(sweeper.run(interval, ttl, shutdown_rx));

    // ── Step 4: Build and start HTTP server ──────────────────────
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_router(AppState::new(config, storage));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("filexfer server listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 6: Wait for background tasks ────────────────────────
    tracing::info!("Waiting for background tasks to complete...");
    if tokio::time::timeout(grace, sweeper_handle).await.is_err() {
        tracing::warn!("Session sweeper did not stop within {:?}", grace);
    }

    tracing::info!("filexfer server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
