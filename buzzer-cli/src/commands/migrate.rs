//! Schema migration command

use anyhow::{Context, Result};
use buzzer_server::PgManager;
use clap::Parser;

use super::DatabaseArgs;

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,
}

/// Create tables and indexes, then exit
pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let config = super::load_config(&args.db)?;
    let manager = PgManager::new(&config.database.url()).context("Invalid database URL")?;

    super::migrate(&manager).await?;
    println!("Schema is up to date");
    Ok(())
}
