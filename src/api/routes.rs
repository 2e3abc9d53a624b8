//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::{handlers::*, security::api_rate_limit};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // Gameplay endpoints share the per-client request budget
    let api = Router::new()
        .route("/game/state", get(game_state_handler))
        .route("/game/spin", post(spin_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_rate_limit));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .fallback(not_found_handler)
        .with_state(state)
}
