//! qrtrak-rd library - Redirector service
//!
//! Resolves dynamic QR code identifiers to their configured
//! destinations, enforcing per-plan monthly scan quotas and recording
//! scan analytics along the way.

use axum::Router;
use sqlx::SqlitePool;

use crate::resolver::RedirectResolver;

pub mod api;
pub mod config;
pub mod db;
pub mod resolver;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Redirect resolution core (owns the database pool handle)
    pub resolver: RedirectResolver,
    /// Where the quota-exceeded page sends users to upgrade
    pub upgrade_url: String,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, upgrade_url: String) -> Self {
        Self {
            resolver: RedirectResolver::new(db),
            upgrade_url,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/r/:id", get(api::resolve_redirect))
        .route("/health", get(api::health_check))
        .route("/api/buildinfo", get(api::get_build_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
