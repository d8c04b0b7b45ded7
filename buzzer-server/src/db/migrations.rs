//! Schema setup for games and commentary
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so this runs on every
//! `buzzer serve` as well as from `buzzer migrate`.

use sqlx::PgConnection;

/// Create tables and indexes if they are missing.
pub async fn run(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    tracing::info!("running schema migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id BIGSERIAL PRIMARY KEY,
            home_team VARCHAR(100) NOT NULL,
            away_team VARCHAR(100) NOT NULL,
            game_date TIMESTAMPTZ NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'upcoming'
                CHECK (status IN ('upcoming', 'live', 'finished')),
            home_score INT NOT NULL DEFAULT 0 CHECK (home_score >= 0),
            away_score INT NOT NULL DEFAULT 0 CHECK (away_score >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS commentary (
            id BIGSERIAL PRIMARY KEY,
            game_id BIGINT NOT NULL REFERENCES games(id),
            message TEXT NOT NULL,
            "timestamp" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            event_type VARCHAR(50) NOT NULL DEFAULT 'play',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_game_date ON games (game_date)",
        "CREATE INDEX IF NOT EXISTS idx_status ON games (status)",
        r#"CREATE INDEX IF NOT EXISTS idx_game_timestamp ON commentary (game_id, "timestamp")"#,
        "CREATE INDEX IF NOT EXISTS idx_event_type ON commentary (event_type)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(&mut *conn).await?;
    }

    tracing::info!("schema migrations complete");
    Ok(())
}
