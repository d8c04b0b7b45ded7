//! Service configuration - environment loading
//!
//! Every setting has a default and can be overridden by an environment
//! variable (the CLI loads `.env` first):
//! - `BUZZER_HOST` / `PORT`: bind address (default 0.0.0.0:5000)
//! - `DATABASE_URL`, or `DB_HOST`/`DB_PORT`/`DB_NAME`/`DB_USER`/`DB_PASSWORD`
//! - `BUZZER_STORE`: `postgres` or `memory`
//! - `POOL_*`, `QUERY_TIMEOUT_MS`, `CACHE_*`, `DEFAULT_PAGE_LIMIT`,
//!   `WRITE_CONCURRENCY`, `REQUEST_TIMEOUT_SECS`: tuning knobs

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use buzzer_core::{CacheConfig, GatewayConfig, PoolConfig};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': expected {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{host}:{port} is not a valid bind address")]
    BindAddr { host: String, port: u16 },
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store '{}'", other)),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        })
    }
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    /// Takes precedence over the individual parts when set
    pub url: Option<String>,
}

impl DatabaseConfig {
    /// Connection URL, either the explicit one or built from the parts.
    pub fn url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "buzzer".to_string(),
            user: "admin".to_string(),
            password: "password".to_string(),
            url: None,
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub database: DatabaseConfig,
    pub pool: PoolConfig,
    pub gateway: GatewayConfig,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let pool = PoolConfig::default();
        let gateway = GatewayConfig {
            write_timeout: pool.acquire_timeout,
            ..GatewayConfig::default()
        };

        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            store: StoreKind::default(),
            database: DatabaseConfig::default(),
            pool,
            gateway,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Upper bound for `CACHE_TTL_SECS` (one day)
const MAX_CACHE_TTL_SECS: u64 = 86_400;

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            expected,
        }),
    }
}

impl ServiceConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variables (for testing).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let text = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(host) = text("BUZZER_HOST") {
            config.host = host;
        }
        if let Some(port) = parse(&lookup, "PORT", "a port number")? {
            config.port = port;
        }
        if let Some(store) = parse(&lookup, "BUZZER_STORE", "'postgres' or 'memory'")? {
            config.store = store;
        }

        let db = &mut config.database;
        if let Some(host) = text("DB_HOST") {
            db.host = host;
        }
        if let Some(port) = parse(&lookup, "DB_PORT", "a port number")? {
            db.port = port;
        }
        if let Some(name) = text("DB_NAME") {
            db.name = name;
        }
        if let Some(user) = text("DB_USER") {
            db.user = user;
        }
        if let Some(password) = text("DB_PASSWORD") {
            db.password = password;
        }
        db.url = text("DATABASE_URL");

        let pool = &mut config.pool;
        if let Some(n) = parse(&lookup, "POOL_MIN_SIZE", "a whole number")? {
            pool.min_size = n;
        }
        if let Some(n) = parse(&lookup, "POOL_MAX_SIZE", "a whole number")? {
            pool.max_size = n;
        }
        if let Some(ms) = parse(&lookup, "POOL_ACQUIRE_TIMEOUT_MS", "milliseconds")? {
            pool.acquire_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse(&lookup, "POOL_MAX_IDLE_SECS", "seconds")? {
            pool.max_idle_time = Duration::from_secs(secs);
        }

        let gateway = &mut config.gateway;
        gateway.write_timeout = config.pool.acquire_timeout;
        if let Some(ms) = parse(&lookup, "QUERY_TIMEOUT_MS", "milliseconds")? {
            gateway.query_timeout = Duration::from_millis(ms);
        }
        if let Some(limit) = parse(&lookup, "DEFAULT_PAGE_LIMIT", "a whole number")? {
            gateway.page_limit = limit;
        }
        if let Some(n) = parse(&lookup, "WRITE_CONCURRENCY", "a whole number")? {
            gateway.write_concurrency = n;
        }
        if let Some(secs) = parse::<u64>(&lookup, "CACHE_TTL_SECS", "seconds")? {
            if secs > MAX_CACHE_TTL_SECS {
                return Err(ConfigError::Invalid {
                    var: "CACHE_TTL_SECS",
                    value: secs.to_string(),
                    expected: "at most 86400 seconds",
                });
            }
            gateway.cache.ttl = Duration::from_secs(secs);
        }
        if let Some(n) = parse(&lookup, "CACHE_CAPACITY", "a whole number")? {
            gateway.cache.capacity = n;
        }

        if let Some(secs) = parse(&lookup, "REQUEST_TIMEOUT_SECS", "seconds")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::BindAddr {
                host: self.host.clone(),
                port: self.port,
            })
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.gateway.cache
    }
}
