//! Navigation service (showcue-nav) - Main entry point
//!
//! The navigation authority for showcue: owns the position store, applies
//! navigation commands, and fans out state changes to all session
//! observers over SSE.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showcue_nav::api;
use showcue_nav::bus::NavBus;
use showcue_nav::catalog::SqliteCatalog;
use showcue_nav::engine::NavigationEngine;
use showcue_nav::store::SqliteStore;

/// Command-line arguments for showcue-nav
#[derive(Parser, Debug)]
#[command(name = "showcue-nav")]
#[command(about = "Navigation authority service for showcue")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5850", env = "SHOWCUE_NAV_PORT")]
    port: u16,

    /// Data folder containing the showcue database
    #[arg(short, long, env = "SHOWCUE_DATA_FOLDER")]
    data_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showcue_nav=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let data_folder = showcue_common::config::resolve_data_folder(
        args.data_folder.as_deref(),
        "SHOWCUE_DATA_FOLDER",
    )
    .context("Failed to resolve data folder")?;
    let db_path = showcue_common::config::database_path(&data_folder);

    info!("Starting showcue navigation service on port {}", args.port);
    info!("Database: {}", db_path.display());

    let db_pool = showcue_common::db::open_database(&db_path)
        .await
        .context("Failed to open database")?;

    let engine = Arc::new(NavigationEngine::new(
        Arc::new(SqliteCatalog::new(db_pool.clone())),
        Arc::new(SqliteStore::new(db_pool.clone())),
        Arc::new(NavBus::new()),
    ));

    let app = api::create_router(api::AppContext { engine });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
