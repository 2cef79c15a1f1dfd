//! xcd-live library - live race scoring service
//!
//! Polls a live timing feed for a draft's race, matches feed entries to
//! drafted athletes and scores fantasy teams with cross-country rules.

use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod classifier;
pub mod error;
pub mod feed;
pub mod roster;
pub mod scoring;
pub mod session;

use session::SessionRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Tracked live races, keyed by draft id
    pub registry: Arc<SessionRegistry>,
    /// Admin password for start/stop; empty disables the check
    pub admin_password: String,
    /// Poll interval advertised to clients
    pub poll_interval_secs: u64,
}

impl AppState {
    /// Create new application state
    pub fn new(
        registry: Arc<SessionRegistry>,
        admin_password: String,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            registry,
            admin_password,
            poll_interval_secs,
        }
    }
}

/// Build application router
///
/// Start and stop require the admin password; reads and health are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (mutate tracking state)
    let protected = Router::new()
        .route("/api/live-race/:draft_id/start", post(api::start_race))
        .route("/api/live-race/:draft_id/stop", post(api::stop_race))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::admin_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route("/api/live-race/:draft_id/status", get(api::get_status))
        .route("/api/live-race/:draft_id/team/:team_id", get(api::get_team))
        .route("/api/live-race/:draft_id/debug", get(api::debug_race))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
