//! Subcommand implementations

pub mod migrate;
pub mod seed;
pub mod serve;

use anyhow::{Context, Result};
use buzzer_core::{CommentaryStore, ConnectionManager, Pool, QueryGateway};
use buzzer_server::db::migrations;
use buzzer_server::{PgManager, ServiceConfig};
use clap::Args;
use tracing::info;

pub use migrate::run_migrate;
pub use seed::run_seed_demo;
pub use serve::run_serve;

/// Database connection flags shared by the subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Database URL (overrides DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Environment configuration with command-line overrides applied.
pub fn load_config(db: &DatabaseArgs) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::from_env().context("Invalid configuration")?;
    if let Some(url) = &db.database_url {
        config.database.url = Some(url.clone());
    }
    Ok(config)
}

/// Create the schema through a one-off session.
pub async fn migrate(manager: &PgManager) -> Result<()> {
    let mut session = manager
        .connect()
        .await
        .context("Failed to connect to database")?;
    migrations::run(session.connection())
        .await
        .context("Failed to run migrations")
}

/// Build a gateway: open the pool, seed stats and start pool maintenance.
pub async fn start_gateway<M>(manager: M, config: &ServiceConfig) -> Result<QueryGateway<M>>
where
    M: ConnectionManager,
    M::Connection: CommentaryStore,
{
    let pool = Pool::new(manager, config.pool.clone());
    let opened = pool
        .warm_up()
        .await
        .context("Failed to open database connections")?;

    let gateway = QueryGateway::new(pool, config.gateway.clone());
    let counts = gateway.seed_stats().await.context("Failed to seed stats")?;
    gateway.pool().spawn_maintenance();

    info!(
        connections = opened,
        total_games = counts.total_games,
        total_commentary = counts.total_commentary,
        "gateway ready"
    );
    Ok(gateway)
}
