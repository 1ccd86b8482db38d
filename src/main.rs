//! Storefront Backend Server
//!
//! HTTP API for accounts and authentication, with request screening,
//! login/registration throttling and security headers on every response.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;

use storefront_server::auth::LogResetDelivery;
use storefront_server::config::Config;
use storefront_server::rate_limiter::MemoryCounterStore;
use storefront_server::security::TracingSecurityLog;
use storefront_server::store::{MemoryUserStore, PgUserStore, UserStore};
use storefront_server::{app, AppState};

/// How often expired rate-limit windows are dropped from memory
const COUNTER_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting storefront server");

    let users: Arc<dyn UserStore> = match &config.database_url {
        Some(database_url) => {
            let store = PgUserStore::connect(&config, database_url).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory user store");
            Arc::new(MemoryUserStore::new())
        }
    };

    let counters = Arc::new(MemoryCounterStore::new());
    let purge_counters = counters.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(COUNTER_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_counters.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged expired rate-limit counters");
            }
        }
    });

    let state = AppState::new(
        &config,
        users,
        counters,
        Arc::new(TracingSecurityLog),
        Arc::new(LogResetDelivery),
    )?;

    let app = app(state, &config);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
