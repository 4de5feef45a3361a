//! API module - HTTP handlers and routes

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::read_root))
        // Health check
        .route("/health", get(handlers::health_check))
        // Devices
        .route("/discover", get(handlers::discover))
        .route("/monitor", get(handlers::monitor))
        .route("/connect", post(handlers::connect))
        .route("/disconnect", post(handlers::disconnect))
        // Desk
        .route("/set-height", post(handlers::set_height))
}
