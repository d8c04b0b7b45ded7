//! Storage seam implemented by each database backend
//!
//! A backend's pooled connection type implements [`CommentaryStore`]; the
//! gateway runs every operation through a checked-out connection, so a
//! backend never manages its own concurrency.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{CommentaryEntry, Game, GameSummary, NewCommentary, NewGame, Page};
use crate::stats::StatsCounts;

/// Row-level operations on games and commentary
#[async_trait]
pub trait CommentaryStore: Send {
    /// All games with their commentary counts, most recent `game_date` first.
    async fn list_games(&mut self) -> Result<Vec<GameSummary>, StoreError>;

    async fn get_game(&mut self, game_id: i64) -> Result<Option<Game>, StoreError>;

    async fn game_exists(&mut self, game_id: i64) -> Result<bool, StoreError>;

    /// One page of a game's commentary, newest first (ties broken by id,
    /// newest first).
    async fn list_commentary(
        &mut self,
        game_id: i64,
        page: Page,
    ) -> Result<Vec<CommentaryEntry>, StoreError>;

    /// Insert one entry and return its id.
    ///
    /// A missing game must surface as [`StoreError::ForeignKey`].
    async fn insert_commentary(&mut self, entry: &NewCommentary) -> Result<i64, StoreError>;

    async fn insert_game(&mut self, game: &NewGame) -> Result<Game, StoreError>;

    /// Persist status and scores of `game`. `None` if the row is gone.
    async fn update_game(&mut self, game: &Game) -> Result<Option<Game>, StoreError>;

    /// Full aggregation used to seed the stats aggregator.
    async fn aggregate_stats(&mut self) -> Result<StatsCounts, StoreError>;
}
