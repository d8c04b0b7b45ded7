//! buzzer CLI - Live sports commentary API
//!
//! Entry point for the `buzzer` binary:
//! - `serve`: run the HTTP API (PostgreSQL or in-memory store)
//! - `migrate`: create the schema and exit
//! - `seed-demo`: insert a few demo games with a commentary feed

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use commands::{migrate::MigrateArgs, seed::SeedArgs, serve::ServeArgs};
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "buzzer",
    author,
    version,
    about = "Live sports commentary API",
    long_about = "Serve game listings and live commentary feeds over HTTP, backed by a \
                  pooled PostgreSQL connection and a short-lived read cache."
)]
struct Cli {
    /// Enable debug logging for the buzzer crates (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),

    /// Create tables and indexes, then exit
    Migrate(MigrateArgs),

    /// Insert demo games and a live commentary feed
    SeedDemo(SeedArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; a malformed one is worth a warning
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();
    if let Err(err) = dotenv {
        if !err.not_found() {
            tracing::warn!(error = %err, "failed to load .env");
        }
    }

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Migrate(args) => commands::run_migrate(args).await?,
        Commands::SeedDemo(args) => commands::run_seed_demo(args).await?,
    }

    Ok(())
}
