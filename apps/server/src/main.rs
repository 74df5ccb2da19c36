//! # Billbook Server
//!
//! One process per business account.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. tracing (RUST_LOG, default "info,billbook=debug,sqlx=warn")        │
//! │  2. ServerConfig::from_env()          BILLBOOK_* variables              │
//! │  3. Database::new(..)                 pool + migrations                 │
//! │  4. AppState::new(..)                 composer, export template         │
//! │  5. axum::serve(..)                   until Ctrl+C / SIGTERM            │
//! │  6. db.close()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several accounts run side by side as separate processes:
//!
//! ```bash
//! BILLBOOK_ACCOUNT_ID=shop-1 BILLBOOK_PORT=3001 billbook-server &
//! BILLBOOK_ACCOUNT_ID=shop-2 BILLBOOK_PORT=3002 billbook-server &
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use billbook_db::{Database, DbConfig};
use billbook_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env().context("loading configuration")?;
    info!(
        account_id = %config.account_id,
        address = %config.bind_address(),
        database = %config.database_path.display(),
        "Configuration loaded"
    );

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let db = Database::new(
        DbConfig::new(&config.database_path).account_id(config.account_id.clone()),
    )
    .await
    .context("opening database")?;

    let address = config.bind_address();
    let state = AppState::new(db.clone(), config).context("loading export template")?;
    let app = router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "Billbook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,billbook=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
