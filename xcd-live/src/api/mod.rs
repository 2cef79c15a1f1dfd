//! HTTP API handlers for xcd-live

pub mod auth;
pub mod health;
pub mod live_race;

pub use auth::admin_middleware;
pub use health::health_routes;
pub use live_race::{debug_race, get_status, get_team, start_race, stop_race};
