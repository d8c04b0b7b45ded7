//! Tracing setup for the buzzer CLI
//!
//! Usage:
//!   buzzer --debug serve               # Debug logging for the buzzer crates
//!   RUST_LOG=buzzer_core=debug buzzer  # Fine-grained log control
//!
//! Environment variables:
//!   RUST_LOG                           # Log filter (default: info)

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Filter used by `--debug` when RUST_LOG is unset. sqlx stays at info,
/// it logs every statement at debug.
const DEBUG_FILTER: &str = "info,buzzer=debug,buzzer_core=debug,buzzer_server=debug,tower_http=debug";

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    pub debug: bool,
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        let fallback = if self.debug { DEBUG_FILTER } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    }
}

/// Install the console subscriber.
pub fn init(config: &TracingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(config.debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
