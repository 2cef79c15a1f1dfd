//! xcd-live - Live race scoring service
//!
//! Serves live fantasy standings for drafts whose race is being timed on a
//! public live results feed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use xcd_common::config::{ConfigOverrides, TomlConfig};
use xcd_common::db::init_database;
use xcd_live::feed::PtTimingClient;
use xcd_live::roster::SqliteRosterProvider;
use xcd_live::session::SessionRegistry;
use xcd_live::{build_router, AppState};

/// Command-line arguments for xcd-live
#[derive(Parser, Debug)]
#[command(name = "xcd-live")]
#[command(about = "Live race scoring service for XC Draft")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "XCD_PORT")]
    port: Option<u16>,

    /// SQLite database path (overrides the config file)
    #[arg(short, long, env = "XCD_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(&ConfigOverrides {
        config_path: args.config,
        database_path: args.database,
        port: args.port,
    })
    .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();

    info!("Starting XC Draft live scoring (xcd-live) v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    info!("✓ Database ready");

    if config.admin_password.is_empty() {
        warn!("No admin password configured; start/stop routes are unprotected");
    }

    let feed = PtTimingClient::new(
        &config.live_race.feed_base_url,
        config.live_race.fetch_timeout(),
    )
    .context("Failed to build timing feed client")?;
    let registry = SessionRegistry::new(
        Arc::new(feed),
        Arc::new(SqliteRosterProvider::new(pool)),
        config.live_race.fetch_timeout(),
    );

    let state = AppState::new(
        Arc::new(registry),
        config.admin_password.clone(),
        config.live_race.poll_interval_secs,
    );
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("xcd-live listening on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
