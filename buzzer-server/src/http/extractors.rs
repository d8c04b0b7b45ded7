//! Custom Axum extractors

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use buzzer_core::models::ValidationError;

use super::error::ApiError;

/// Extract a game id from the `{id}` path segment
pub struct GameId(pub i64);

impl<S> FromRequestParts<S> for GameId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::from(ValidationError::Empty { field: "game id" }))?;

        let id = id.parse::<i64>().map_err(|_| {
            ApiError::from(ValidationError::InvalidFormat {
                field: "game id",
                reason: "must be an integer",
            })
        })?;

        Ok(Self(id))
    }
}
