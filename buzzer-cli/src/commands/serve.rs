//! HTTP server command
//!
//! Runs migrations (PostgreSQL only), warms the pool, seeds the stats
//! counters and serves until Ctrl+C/SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use buzzer_core::{CommentaryStore, ConnectionManager, MemoryManager};
use buzzer_server::{run_server, PgManager, ServerConfig, ServiceConfig, StoreKind};
use clap::Parser;

use super::DatabaseArgs;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 0.0.0.0)
    #[arg(long, env = "BUZZER_HOST")]
    pub host: Option<String>,

    /// Port to listen on (default: 5000)
    #[arg(long, short = 'p', env = "PORT")]
    pub port: Option<u16>,

    /// Storage backend: postgres or memory
    #[arg(long, env = "BUZZER_STORE")]
    pub store: Option<StoreKind>,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

impl ServeArgs {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(store) = self.store {
            config.store = store;
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = super::load_config(&args.db)?;
    args.apply(&mut config);

    let server = ServerConfig {
        bind_addr: config.bind_addr()?,
        request_timeout: config.request_timeout,
    };
    tracing::info!(store = %config.store, addr = %server.bind_addr, "starting buzzer");

    match config.store {
        StoreKind::Memory => {
            tracing::warn!("using in-memory store, data is lost on exit");
            serve_with(MemoryManager::default(), &config, server).await
        }
        StoreKind::Postgres => {
            let manager =
                PgManager::new(&config.database.url()).context("Invalid database URL")?;
            super::migrate(&manager).await?;
            serve_with(manager, &config, server).await
        }
    }
}

async fn serve_with<M>(manager: M, config: &ServiceConfig, server: ServerConfig) -> Result<()>
where
    M: ConnectionManager,
    M::Connection: CommentaryStore,
{
    let gateway = super::start_gateway(manager, config).await?;
    let pool = gateway.pool().clone();

    // Run server (blocks until shutdown)
    let result = run_server(Arc::new(gateway), server)
        .await
        .context("Server error");

    pool.close();
    result
}
