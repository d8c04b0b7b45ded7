//! Commentary feed endpoints

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use buzzer_core::models::{CommentaryEntry, PageParams};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::GameId;
use crate::http::server::AppState;

/// Commentary page response
#[derive(Serialize)]
pub struct CommentaryResponse {
    pub commentary: Arc<Vec<CommentaryEntry>>,
}

/// Add commentary request.
///
/// `message` is optional here so a missing field is reported as a
/// validation error rather than a decode error.
#[derive(Deserialize)]
pub struct AddCommentaryRequest {
    pub message: Option<String>,
    pub event_type: Option<String>,
}

/// Add commentary response
#[derive(Serialize)]
pub struct AddCommentaryResponse {
    pub success: bool,
    pub commentary_id: i64,
}

/// GET /api/games/{id}/commentary?limit&offset - newest first
async fn list_commentary(
    State(state): State<AppState>,
    GameId(game_id): GameId,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<CommentaryResponse>, ApiError> {
    let Query(params) = query?;
    let commentary = state.service.list_commentary(game_id, params).await?;
    Ok(Json(CommentaryResponse { commentary }))
}

/// POST /api/games/{id}/commentary - append an entry
async fn add_commentary(
    State(state): State<AppState>,
    GameId(game_id): GameId,
    payload: Result<Json<AddCommentaryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddCommentaryResponse>), ApiError> {
    let Json(req) = payload?;

    let commentary_id = state
        .service
        .add_commentary(
            game_id,
            req.message.as_deref().unwrap_or_default(),
            req.event_type.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddCommentaryResponse {
            success: true,
            commentary_id,
        }),
    ))
}

/// Commentary routes
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/games/{id}/commentary",
        get(list_commentary).post(add_commentary),
    )
}
