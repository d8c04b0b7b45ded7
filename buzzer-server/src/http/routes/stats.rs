//! Aggregate statistics endpoint
//!
//! GET /api/stats - served from the in-memory counters, never a table scan.

use axum::{extract::State, routing::get, Json, Router};
use buzzer_core::StatsCounts;
use chrono::Utc;
use serde::Serialize;

use crate::http::server::AppState;

/// Stats response
#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counts: StatsCounts,
    pub timestamp: String,
}

/// GET /api/stats
async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        counts: state.service.get_stats(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Stats routes
pub fn router() -> Router<AppState> {
    Router::new().route("/api/stats", get(stats))
}
