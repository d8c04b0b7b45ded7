//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod commentary;
pub mod game;
pub mod pagination;
pub mod validation;

pub use commentary::{CommentaryEntry, EventType, MessageText, NewCommentary};
pub use game::{Game, GamePatch, GameStatus, GameSummary, NewGame, TeamName};
pub use pagination::{Page, PageParams, DEFAULT_PAGE_LIMIT};
pub use validation::ValidationError;
