//! # Curio API Server
//!
//! This is the main API server for Curio, a personal collectibles
//! tracker. It provides:
//! - User registration and JWT authentication
//! - Owner-scoped CRUD for tags, items, and collections
//! - Collection filtering by associated tags and items
//! - Collection image upload
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p curio-api
//! ```

use curio_api::{app, config::Config};
use curio_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, DatabaseConfig},
    wait::{wait_for_db, WaitConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curio_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Curio API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    // The database may still be coming up when we are; retry before
    // giving up
    let pool = wait_for_db(
        &config.database.url,
        WaitConfig {
            pool: DatabaseConfig {
                url: config.database.url.clone(),
                max_connections: config.database.max_connections,
                ..DatabaseConfig::default()
            },
            ..WaitConfig::default()
        },
    )
    .await?;

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let state = app::AppState::new(pool.clone(), config.clone());
    let router = app::build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves when the process receives Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    } else {
        tracing::info!("Shutdown signal received");
    }
}
