/// Error types for buzzer-core.
///
/// `StoreError` is what a storage backend reports; `GatewayError` is the
/// only error the HTTP layer ever sees. Backends classify their driver
/// errors into `StoreError` and the gateway translates those at its
/// boundary, so raw driver errors never leak past it.
use thiserror::Error;

use crate::models::ValidationError;

/// Failure reported by a storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity to the database was lost or could not be established
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// A referenced row does not exist
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// Any other database failure
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    pub fn other(reason: impl Into<String>) -> Self {
        Self::Other(reason.into())
    }

    /// True if the error means the database itself cannot be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors returned by the query gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No pooled connection became available within the acquire timeout
    #[error("no database connection available within {waited_ms}ms")]
    PoolExhausted { waited_ms: u64 },

    /// The pool is degraded or the database cannot be reached
    #[error("database unavailable")]
    DatabaseUnavailable,

    /// Referenced game does not exist
    #[error("game {0} not found")]
    GameNotFound(i64),

    /// Input failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A database call exceeded the query timeout
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// Too many writes in flight
    #[error("too many concurrent writes")]
    Overloaded,

    /// Unclassified store failure (details are logged, not returned)
    #[error("internal error")]
    Internal,
}

impl GatewayError {
    /// Transient errors the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. }
                | Self::DatabaseUnavailable
                | Self::QueryTimeout { .. }
                | Self::Overloaded
        )
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
