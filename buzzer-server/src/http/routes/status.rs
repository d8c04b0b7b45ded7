//! Diagnostics endpoint
//!
//! GET /api/status - pool occupancy and cache counters.

use axum::{extract::State, routing::get, Json, Router};
use buzzer_core::GatewayHealth;

use crate::http::server::AppState;

/// GET /api/status
async fn status(State(state): State<AppState>) -> Json<GatewayHealth> {
    Json(state.service.health())
}

/// Status routes
pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", get(status))
}
