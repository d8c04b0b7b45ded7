//! buzzer-server: PostgreSQL backend and HTTP API for live commentary
//!
//! Wires the `buzzer_core` query gateway to an axum router and provides
//! the sqlx-backed store, schema migrations and environment configuration.

pub mod config;
pub mod db;
pub mod http;

pub use config::{ConfigError, DatabaseConfig, ServiceConfig, StoreKind};
pub use db::{PgManager, PgSession};
pub use http::{build_router, run_server, ServerConfig, ServerError};
