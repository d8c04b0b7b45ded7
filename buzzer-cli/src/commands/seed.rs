//! Demo data command

use anyhow::{Context, Result};
use buzzer_core::models::{EventType, GamePatch, GameStatus, NewGame};
use buzzer_server::PgManager;
use chrono::{Duration, Utc};
use clap::Parser;
use tracing::info;

use super::DatabaseArgs;

/// Arguments for the seed-demo command
#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Skip the commentary feed, only create games
    #[arg(long)]
    pub games_only: bool,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

/// Commentary for the live demo game, oldest first.
const LIVE_FEED: &[(&str, &str)] = &[
    ("period", "Tip-off! We are underway."),
    ("play", "Quick ball movement on the perimeter, shot clock winding down."),
    ("score", "Three-pointer from the corner, home side on the board."),
    ("foul", "Reach-in foul called at midcourt."),
    ("substitution", "Fresh legs coming in for the visitors."),
    ("score", "Fast break finished with a dunk!"),
    ("timeout", "Away coach calls a timeout to stop the run."),
];

/// Insert a small set of demo games and a live commentary feed
pub async fn run_seed_demo(args: SeedArgs) -> Result<()> {
    let config = super::load_config(&args.db)?;
    let manager = PgManager::new(&config.database.url()).context("Invalid database URL")?;
    super::migrate(&manager).await?;

    let gateway = super::start_gateway(manager, &config).await?;
    let now = Utc::now();

    let live = gateway
        .create_game(NewGame::new("Harbor City Hawks", "Riverside Rapids", now)?)
        .await
        .context("Failed to create demo game")?;
    let upcoming = gateway
        .create_game(NewGame::new(
            "Northgate Owls",
            "Summit Peaks",
            now + Duration::days(1),
        )?)
        .await
        .context("Failed to create demo game")?;
    let finished = gateway
        .create_game(
            NewGame::new("Lakeside Lynx", "Desert Foxes", now - Duration::days(1))?
                .with_status(GameStatus::Finished)
                .with_scores(98, 91)?,
        )
        .await
        .context("Failed to create demo game")?;

    let mut entries = 0;
    if !args.games_only {
        let mut home_score = 0;
        for (event_type, message) in LIVE_FEED {
            gateway
                .add_commentary(live.id, message, Some(*event_type))
                .await
                .with_context(|| format!("Failed to add commentary to game {}", live.id))?;
            entries += 1;
            if *event_type == EventType::SCORE {
                home_score += 2;
            }
        }

        let patch = GamePatch {
            status: Some(GameStatus::Live),
            home_score: Some(home_score),
            away_score: Some(0),
        };
        gateway
            .update_game(live.id, patch)
            .await
            .context("Failed to update demo game")?;
    }

    let stats = gateway.get_stats();
    gateway.pool().close();

    info!(games = 3, entries, "demo data inserted");
    println!(
        "Created games {}, {} and {} with {} commentary entries",
        live.id, upcoming.id, finished.id, entries
    );
    println!(
        "Totals: {} games, {} commentary entries",
        stats.total_games, stats.total_commentary
    );
    Ok(())
}
