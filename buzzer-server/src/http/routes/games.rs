//! Game endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use buzzer_core::models::{game::score, Game, GamePatch, GameStatus, GameSummary, NewGame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::GameId;
use crate::http::server::AppState;

/// Game listing response
#[derive(Serialize)]
pub struct GamesResponse {
    pub games: Arc<Vec<GameSummary>>,
}

/// Create game request
#[derive(Deserialize)]
pub struct CreateGameRequest {
    pub home_team: String,
    pub away_team: String,
    pub game_date: DateTime<Utc>,
    pub status: Option<String>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

/// Score/status update request
#[derive(Deserialize)]
pub struct UpdateGameRequest {
    pub status: Option<String>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

/// GET /api/games - all games with commentary counts
async fn list_games(State(state): State<AppState>) -> Result<Json<GamesResponse>, ApiError> {
    let games = state.service.list_games().await?;
    Ok(Json(GamesResponse { games }))
}

/// POST /api/games - schedule a game
async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Game>), ApiError> {
    let Json(req) = payload?;

    let mut game = NewGame::new(&req.home_team, &req.away_team, req.game_date)?
        .with_scores(req.home_score.unwrap_or(0), req.away_score.unwrap_or(0))?;
    if let Some(status) = req.status.as_deref() {
        game = game.with_status(status.parse::<GameStatus>()?);
    }

    let created = state.service.create_game(game).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/games/{id} - update score or status
async fn update_game(
    State(state): State<AppState>,
    GameId(game_id): GameId,
    payload: Result<Json<UpdateGameRequest>, JsonRejection>,
) -> Result<Json<Game>, ApiError> {
    let Json(req) = payload?;

    let patch = GamePatch {
        status: req.status.as_deref().map(str::parse::<GameStatus>).transpose()?,
        home_score: req.home_score.map(|v| score("home_score", v)).transpose()?,
        away_score: req.away_score.map(|v| score("away_score", v)).transpose()?,
    };

    let updated = state.service.update_game(game_id, patch).await?;
    Ok(Json(updated))
}

/// Game routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/games", get(list_games).post(create_game))
        .route("/api/games/{id}", patch(update_game))
}
