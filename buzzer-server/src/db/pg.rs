//! PostgreSQL store backend
//!
//! One `PgConnection` per pooled session; the pool in `buzzer_core` owns
//! sizing and health. Every operation is a single statement:
//! - Game listing uses a LEFT JOIN for commentary counts (no N+1)
//! - Commentary inserts rely on the foreign key, no check-then-insert

use async_trait::async_trait;
use buzzer_core::error::StoreError;
use buzzer_core::models::{
    CommentaryEntry, Game, GameStatus, GameSummary, NewCommentary, NewGame, Page,
};
use buzzer_core::stats::{EventCount, StatsCounts};
use buzzer_core::{CommentaryStore, ConnectionManager};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Connection, PgConnection, Row};

const GAME_COLUMNS: &str =
    "id, home_team, away_team, game_date, status, home_score, away_score, created_at";

/// Map a driver error onto the store taxonomy.
pub fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::unavailable(err.to_string()),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::ForeignKey(db.message().to_owned())
        }
        // Class 08 is connection exceptions; 57P0x is server shutdown
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| code.starts_with("08") || code.starts_with("57P0")) =>
        {
            StoreError::unavailable(err.to_string())
        }
        _ => StoreError::other(err.to_string()),
    }
}

fn game_from_row(row: &PgRow) -> Result<Game, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status: GameStatus = status
        .parse()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Game {
        id: row.try_get("id")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        game_date: row.try_get("game_date")?,
        status,
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
        created_at: row.try_get("created_at")?,
    })
}

fn commentary_from_row(row: &PgRow) -> Result<CommentaryEntry, sqlx::Error> {
    Ok(CommentaryEntry {
        id: row.try_get("id")?,
        game_id: row.try_get("game_id")?,
        message: row.try_get("message")?,
        timestamp: row.try_get("timestamp")?,
        event_type: row.try_get("event_type")?,
        created_at: row.try_get("created_at")?,
    })
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Opens sessions against one PostgreSQL database
#[derive(Debug, Clone)]
pub struct PgManager {
    options: PgConnectOptions,
}

impl PgManager {
    /// Parse a `postgres://` URL.
    pub fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            options: database_url.parse()?,
        })
    }
}

#[async_trait]
impl ConnectionManager for PgManager {
    type Connection = PgSession;

    async fn connect(&self) -> Result<PgSession, StoreError> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(classify)?;
        Ok(PgSession { conn })
    }

    async fn is_valid(&self, session: &mut PgSession) -> Result<(), StoreError> {
        session.conn.ping().await.map_err(classify)
    }
}

/// A pooled PostgreSQL session
pub struct PgSession {
    conn: PgConnection,
}

impl PgSession {
    /// Raw connection, for schema setup.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

#[async_trait]
impl CommentaryStore for PgSession {
    async fn list_games(&mut self) -> Result<Vec<GameSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                g.id, g.home_team, g.away_team, g.game_date, g.status,
                g.home_score, g.away_score, g.created_at,
                COUNT(c.id) AS commentary_count
            FROM games g
            LEFT JOIN commentary c ON c.game_id = g.id
            GROUP BY g.id
            ORDER BY g.game_date DESC, g.id DESC
            "#,
        )
        .fetch_all(&mut self.conn)
        .await
        .map_err(classify)?;

        rows.iter()
            .map(|row| -> Result<GameSummary, sqlx::Error> {
                Ok(GameSummary {
                    game: game_from_row(row)?,
                    commentary_count: row.try_get("commentary_count")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(classify)
    }

    async fn get_game(&mut self, game_id: i64) -> Result<Option<Game>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM games WHERE id = $1", GAME_COLUMNS))
            .bind(game_id)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(classify)?;

        row.as_ref().map(game_from_row).transpose().map_err(classify)
    }

    async fn game_exists(&mut self, game_id: i64) -> Result<bool, StoreError> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM games WHERE id = $1)")
            .bind(game_id)
            .fetch_one(&mut self.conn)
            .await
            .map_err(classify)?;
        Ok(exists.0)
    }

    async fn list_commentary(
        &mut self,
        game_id: i64,
        page: Page,
    ) -> Result<Vec<CommentaryEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, message, "timestamp", event_type, created_at
            FROM commentary
            WHERE game_id = $1
            ORDER BY "timestamp" DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(game_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut self.conn)
        .await
        .map_err(classify)?;

        rows.iter()
            .map(commentary_from_row)
            .collect::<Result<_, sqlx::Error>>()
            .map_err(classify)
    }

    async fn insert_commentary(&mut self, entry: &NewCommentary) -> Result<i64, StoreError> {
        let id: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO commentary (game_id, message, "timestamp", event_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(entry.game_id)
        .bind(entry.message.as_str())
        .bind(entry.timestamp)
        .bind(entry.event_type.as_str())
        .fetch_one(&mut self.conn)
        .await
        .map_err(classify)?;
        Ok(id.0)
    }

    async fn insert_game(&mut self, game: &NewGame) -> Result<Game, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO games (home_team, away_team, game_date, status, home_score, away_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            GAME_COLUMNS
        ))
        .bind(game.home_team.as_str())
        .bind(game.away_team.as_str())
        .bind(game.game_date)
        .bind(game.status.as_str())
        .bind(game.home_score)
        .bind(game.away_score)
        .fetch_one(&mut self.conn)
        .await
        .map_err(classify)?;

        game_from_row(&row).map_err(classify)
    }

    async fn update_game(&mut self, game: &Game) -> Result<Option<Game>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE games
            SET status = $2, home_score = $3, away_score = $4
            WHERE id = $1
            RETURNING {}
            "#,
            GAME_COLUMNS
        ))
        .bind(game.id)
        .bind(game.status.as_str())
        .bind(game.home_score)
        .bind(game.away_score)
        .fetch_optional(&mut self.conn)
        .await
        .map_err(classify)?;

        row.as_ref().map(game_from_row).transpose().map_err(classify)
    }

    async fn aggregate_stats(&mut self) -> Result<StatsCounts, StoreError> {
        let totals: (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM games), (SELECT COUNT(*) FROM commentary)",
        )
        .fetch_one(&mut self.conn)
        .await
        .map_err(classify)?;

        let breakdown: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT event_type, COUNT(*)
            FROM commentary
            GROUP BY event_type
            ORDER BY event_type
            "#,
        )
        .fetch_all(&mut self.conn)
        .await
        .map_err(classify)?;

        Ok(StatsCounts {
            total_games: count(totals.0),
            total_commentary: count(totals.1),
            event_breakdown: breakdown
                .into_iter()
                .map(|(event_type, n)| EventCount {
                    event_type,
                    count: count(n),
                })
                .collect(),
        })
    }
}
