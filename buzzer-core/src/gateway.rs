//! Query gateway: typed operations over the pool, cache and stats
//!
//! Reads go cache first and fall back to one store call on a pooled
//! connection. Writes take a permit from a bounded write semaphore, commit,
//! then invalidate the affected cache keys and update the counters. Every
//! store call runs under the query timeout and every store failure is
//! translated into a [`GatewayError`] here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{error::Elapsed, timeout};
use tracing::{debug, error, info, warn};

use crate::cache::{
    commentary_key, commentary_prefix, CacheConfig, CacheMetrics, ReadCache, GAMES_LIST_KEY,
};
use crate::error::{GatewayError, Result, StoreError};
use crate::models::{
    CommentaryEntry, EventType, Game, GamePatch, GameSummary, MessageText, NewCommentary,
    NewGame, Page, PageParams, DEFAULT_PAGE_LIMIT,
};
use crate::pool::{ConnectionManager, Pool, PoolError, PoolStatus, PooledConnection};
use crate::stats::{StatsAggregator, StatsCounts};
use crate::store::CommentaryStore;

/// Gateway tuning
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Default and maximum commentary page size
    pub page_limit: u32,
    /// Upper bound on a single store call
    pub query_timeout: Duration,
    /// Writes allowed in flight at once
    pub write_concurrency: usize,
    /// How long a write waits for a slot before failing with `Overloaded`
    pub write_timeout: Duration,
    pub cache: CacheConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            query_timeout: Duration::from_secs(5),
            write_concurrency: 8,
            write_timeout: Duration::from_secs(2),
            cache: CacheConfig::default(),
        }
    }
}

/// Pool and cache diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct GatewayHealth {
    pub pool: PoolStatus,
    pub cache: CacheMetrics,
}

#[derive(Clone)]
enum CachedView {
    Games(Arc<Vec<GameSummary>>),
    Commentary(Arc<Vec<CommentaryEntry>>),
}

/// Typed access to games, commentary and stats
pub struct QueryGateway<M: ConnectionManager> {
    pool: Pool<M>,
    cache: ReadCache<CachedView>,
    stats: StatsAggregator,
    writes: Semaphore,
    config: GatewayConfig,
}

impl<M> QueryGateway<M>
where
    M: ConnectionManager,
    M::Connection: CommentaryStore,
{
    pub fn new(pool: Pool<M>, config: GatewayConfig) -> Self {
        Self {
            pool,
            cache: ReadCache::new(config.cache.clone()),
            stats: StatsAggregator::new(),
            writes: Semaphore::new(config.write_concurrency.max(1)),
            config,
        }
    }

    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn checkout(&self) -> Result<PooledConnection<M>> {
        self.pool.acquire().await.map_err(|err| match err {
            PoolError::Exhausted(waited) => GatewayError::PoolExhausted {
                waited_ms: waited.as_millis() as u64,
            },
            PoolError::Unavailable(_) | PoolError::Closed => GatewayError::DatabaseUnavailable,
        })
    }

    async fn write_permit(&self) -> Result<SemaphorePermit<'_>> {
        match timeout(self.config.write_timeout, self.writes.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) | Err(_) => {
                warn!(
                    write_concurrency = self.config.write_concurrency,
                    "write rejected, too many writes in flight"
                );
                Err(GatewayError::Overloaded)
            }
        }
    }

    /// Translate the outcome of one timed store call.
    fn settle<T>(
        &self,
        conn: &mut PooledConnection<M>,
        op: &'static str,
        outcome: std::result::Result<std::result::Result<T, StoreError>, Elapsed>,
    ) -> Result<T> {
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if err.is_connectivity() => {
                conn.mark_broken();
                self.pool.report_connectivity_loss(&err);
                Err(GatewayError::DatabaseUnavailable)
            }
            Ok(Err(err)) => {
                error!(op, error = %err, "store operation failed");
                Err(GatewayError::Internal)
            }
            Err(_) => {
                // The session is mid-statement; never reuse it
                conn.mark_broken();
                let timeout_ms = self.config.query_timeout.as_millis() as u64;
                warn!(op, timeout_ms, "query timed out");
                Err(GatewayError::QueryTimeout { timeout_ms })
            }
        }
    }

    /// Run the one-time full aggregation and seed the stats counters.
    pub async fn seed_stats(&self) -> Result<StatsCounts> {
        let mut conn = self.checkout().await?;
        let outcome = timeout(self.config.query_timeout, conn.aggregate_stats()).await;
        let counts = self.settle(&mut conn, "aggregate_stats", outcome)?;
        self.stats.seed(&counts);
        Ok(counts)
    }

    /// All games with commentary counts, most recent first.
    pub async fn list_games(&self) -> Result<Arc<Vec<GameSummary>>> {
        if let Some(CachedView::Games(games)) = self.cache.get(GAMES_LIST_KEY) {
            return Ok(games);
        }

        let mut conn = self.checkout().await?;
        let outcome = timeout(self.config.query_timeout, conn.list_games()).await;
        let games = Arc::new(self.settle(&mut conn, "list_games", outcome)?);
        drop(conn);

        self.cache
            .put_default(GAMES_LIST_KEY, CachedView::Games(Arc::clone(&games)));
        Ok(games)
    }

    /// One page of a game's commentary, newest first.
    ///
    /// The limit is clamped to the configured page limit.
    pub async fn list_commentary(
        &self,
        game_id: i64,
        params: PageParams,
    ) -> Result<Arc<Vec<CommentaryEntry>>> {
        let page = Page::resolve(params.limit, params.offset, self.config.page_limit);
        let key = commentary_key(game_id, page.limit, page.offset);
        if let Some(CachedView::Commentary(entries)) = self.cache.get(&key) {
            return Ok(entries);
        }

        let mut conn = self.checkout().await?;
        let outcome = timeout(self.config.query_timeout, conn.list_commentary(game_id, page)).await;
        let entries = self.settle(&mut conn, "list_commentary", outcome)?;

        // An empty page is either past the end or an unknown game
        if entries.is_empty() {
            let outcome = timeout(self.config.query_timeout, conn.game_exists(game_id)).await;
            if !self.settle(&mut conn, "game_exists", outcome)? {
                return Err(GatewayError::GameNotFound(game_id));
            }
        }
        drop(conn);

        let entries = Arc::new(entries);
        self.cache
            .put_default(key, CachedView::Commentary(Arc::clone(&entries)));
        Ok(entries)
    }

    /// Append a commentary entry, returning its id.
    pub async fn add_commentary(
        &self,
        game_id: i64,
        message: &str,
        event_type: Option<&str>,
    ) -> Result<i64> {
        let entry = NewCommentary {
            game_id,
            message: MessageText::new(message)?,
            event_type: EventType::parse_or_default(event_type)?,
            timestamp: Utc::now(),
        };

        let _permit = self.write_permit().await?;
        let mut conn = self.checkout().await?;
        let outcome = timeout(self.config.query_timeout, conn.insert_commentary(&entry)).await;
        if let Ok(Err(StoreError::ForeignKey(_))) = &outcome {
            return Err(GatewayError::GameNotFound(game_id));
        }
        let id = self.settle(&mut conn, "insert_commentary", outcome)?;
        drop(conn);

        self.cache.invalidate(&commentary_prefix(game_id));
        self.cache.invalidate(GAMES_LIST_KEY);
        self.stats.record_commentary(entry.event_type.as_str());

        info!(
            game_id,
            commentary_id = id,
            event_type = %entry.event_type,
            "commentary added"
        );
        Ok(id)
    }

    pub async fn create_game(&self, game: NewGame) -> Result<Game> {
        let _permit = self.write_permit().await?;
        let mut conn = self.checkout().await?;
        let outcome = timeout(self.config.query_timeout, conn.insert_game(&game)).await;
        let created = self.settle(&mut conn, "insert_game", outcome)?;
        drop(conn);

        self.cache.invalidate(GAMES_LIST_KEY);
        self.stats.record_game();

        info!(
            game_id = created.id,
            home_team = %created.home_team,
            away_team = %created.away_team,
            "game created"
        );
        Ok(created)
    }

    /// Apply a score/status update to a game.
    pub async fn update_game(&self, game_id: i64, patch: GamePatch) -> Result<Game> {
        let _permit = self.write_permit().await?;
        let mut conn = self.checkout().await?;

        let outcome = timeout(self.config.query_timeout, conn.get_game(game_id)).await;
        let current = self
            .settle(&mut conn, "get_game", outcome)?
            .ok_or(GatewayError::GameNotFound(game_id))?;
        if patch.is_empty() {
            return Ok(current);
        }

        let updated = patch.apply(&current)?;
        let outcome = timeout(self.config.query_timeout, conn.update_game(&updated)).await;
        let stored = self
            .settle(&mut conn, "update_game", outcome)?
            .ok_or(GatewayError::GameNotFound(game_id))?;
        drop(conn);

        self.cache.invalidate(GAMES_LIST_KEY);
        debug!(
            game_id,
            status = %stored.status,
            home_score = stored.home_score,
            away_score = stored.away_score,
            "game updated"
        );
        Ok(stored)
    }

    /// Current totals from the stats aggregator.
    pub fn get_stats(&self) -> StatsCounts {
        self.stats.snapshot()
    }

    pub fn health(&self) -> GatewayHealth {
        GatewayHealth {
            pool: self.pool.status(),
            cache: self.cache.metrics(),
        }
    }
}

/// Object-safe view of the gateway used by the HTTP layer.
#[async_trait]
pub trait CommentaryService: Send + Sync {
    async fn list_games(&self) -> Result<Arc<Vec<GameSummary>>>;

    async fn list_commentary(
        &self,
        game_id: i64,
        params: PageParams,
    ) -> Result<Arc<Vec<CommentaryEntry>>>;

    async fn add_commentary(
        &self,
        game_id: i64,
        message: &str,
        event_type: Option<&str>,
    ) -> Result<i64>;

    async fn create_game(&self, game: NewGame) -> Result<Game>;

    async fn update_game(&self, game_id: i64, patch: GamePatch) -> Result<Game>;

    fn get_stats(&self) -> StatsCounts;

    fn health(&self) -> GatewayHealth;
}

#[async_trait]
impl<M> CommentaryService for QueryGateway<M>
where
    M: ConnectionManager,
    M::Connection: CommentaryStore,
{
    async fn list_games(&self) -> Result<Arc<Vec<GameSummary>>> {
        QueryGateway::list_games(self).await
    }

    async fn list_commentary(
        &self,
        game_id: i64,
        params: PageParams,
    ) -> Result<Arc<Vec<CommentaryEntry>>> {
        QueryGateway::list_commentary(self, game_id, params).await
    }

    async fn add_commentary(
        &self,
        game_id: i64,
        message: &str,
        event_type: Option<&str>,
    ) -> Result<i64> {
        QueryGateway::add_commentary(self, game_id, message, event_type).await
    }

    async fn create_game(&self, game: NewGame) -> Result<Game> {
        QueryGateway::create_game(self, game).await
    }

    async fn update_game(&self, game_id: i64, patch: GamePatch) -> Result<Game> {
        QueryGateway::update_game(self, game_id, patch).await
    }

    fn get_stats(&self) -> StatsCounts {
        QueryGateway::get_stats(self)
    }

    fn health(&self) -> GatewayHealth {
        QueryGateway::health(self)
    }
}
