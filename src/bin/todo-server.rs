//! # Todo Server
//!
//! Loads configuration, connects to PostgreSQL, applies migrations and serves the HTTP API
//! until Ctrl+C or SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! # Run with config/todo.yaml and DATABASE_URL
//! cargo run --bin todo-server
//!
//! # Override any setting through the environment
//! TODO__HTTP_SERVER__PORT=8080 TODO__ENVIRONMENT=production cargo run --bin todo-server
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use todo_core::config::ConfigManager;
use todo_core::database::{run_migrations, DatabaseConnection, PgStore};
use todo_core::logging;
use todo_core::priority::PriorityAllocator;
use todo_core::web::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_manager = ConfigManager::load().context("failed to load configuration")?;
    let config = config_manager.config().clone();

    logging::init_structured_logging(&config.environment, &config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        config_path = %config_manager.config_path().display(),
        "Starting todo server"
    );

    let connection = DatabaseConnection::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    if config.database.run_migrations {
        run_migrations(connection.pool())
            .await
            .context("failed to run migrations")?;
    }

    let store = Arc::new(PgStore::new(
        connection.pool().clone(),
        PriorityAllocator::from_config(&config.priority),
    ));
    let state = AppState::from_store(config.clone(), store).context("failed to build state")?;
    let app = create_app(state);

    let address = config.http_server.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(address = %address, "HTTP server listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_millis(config.http_server.shutdown_grace_ms);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined
            .context("HTTP server task panicked")?
            .context("HTTP server failed")?,
        Err(_) => warn!(
            grace_ms = config.http_server.shutdown_grace_ms,
            "In-flight requests did not drain in time, forcing shutdown"
        ),
    }

    info!("HTTP server stopped, closing database pool");
    connection.close().await;
    info!("Todo server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
