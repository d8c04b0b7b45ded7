//! Database layer - PostgreSQL backend and schema
//!
//! # Design Principles
//!
//! - Pooling lives in `buzzer_core::pool`; this module only opens sessions
//! - List operations use JOINs, no N+1 queries
//! - Rely on DB constraints (foreign keys, checks), no check-then-insert

pub mod migrations;
pub mod pg;

pub use pg::{classify, PgManager, PgSession};
