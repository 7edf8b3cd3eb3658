//! qrtrak-rd (Redirector) - Dynamic QR code redirect service
//!
//! Resolves `GET /r/{id}` scans to their configured destination URLs,
//! enforcing the owner's monthly scan quota and appending scan
//! analytics. The public-facing half of qrtrak.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use qrtrak_rd::config::{Args, ServiceConfig};
use qrtrak_rd::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting qrtrak Redirector (qrtrak-rd) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = ServiceConfig::from_args(&args)?;
    info!("Database path: {}", config.db_path.display());

    let pool = qrtrak_common::db::init_database(&config.db_path).await?;
    info!("✓ Database ready");

    // Create application state and router
    let state = AppState::new(pool, config.upgrade_url.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("qrtrak-rd listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
