//! In-memory store backend
//!
//! Behaves like the SQL backend (id assignment, ordering, foreign key on
//! `commentary.game_id`) without a database. Used for local demos and by the
//! gateway and router tests, which rely on the per-operation call counters
//! and the availability/latency switches.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::models::{CommentaryEntry, Game, GameSummary, NewCommentary, NewGame, Page};
use crate::pool::ConnectionManager;
use crate::stats::{EventCount, StatsCounts};
use crate::store::CommentaryStore;

#[derive(Default)]
struct Tables {
    games: BTreeMap<i64, Game>,
    commentary: Vec<CommentaryEntry>,
    next_game_id: i64,
    next_commentary_id: i64,
}

/// Store operations counted by [`MemoryDb::calls`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    ListGames,
    GetGame,
    GameExists,
    ListCommentary,
    InsertCommentary,
    InsertGame,
    UpdateGame,
    AggregateStats,
}

impl MemoryOp {
    const COUNT: usize = 8;

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    calls: [AtomicU64; MemoryOp::COUNT],
    connects: AtomicU64,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

/// Shared in-memory database. Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Inner>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of times `op` has been executed.
    pub fn calls(&self, op: MemoryOp) -> u64 {
        self.inner.calls[op.index()].load(Ordering::Acquire)
    }

    /// Number of connections opened against this database.
    pub fn connects(&self) -> u64 {
        self.inner.connects.load(Ordering::Acquire)
    }

    /// Simulate the database going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::Release);
    }

    /// Delay applied to every operation.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.latency_ms.store(ms, Ordering::Release);
    }

    /// Row count of the commentary table.
    pub fn commentary_rows(&self) -> usize {
        self.tables().commentary.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::unavailable("connection refused"));
        }
        Ok(())
    }

    async fn begin(&self, op: MemoryOp) -> Result<(), StoreError> {
        self.check_available()?;
        let latency = self.inner.latency_ms.load(Ordering::Acquire);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.inner.calls[op.index()].fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// [`ConnectionManager`] handing out connections to a [`MemoryDb`]
#[derive(Clone, Default)]
pub struct MemoryManager {
    db: MemoryDb,
}

impl MemoryManager {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &MemoryDb {
        &self.db
    }
}

#[async_trait]
impl ConnectionManager for MemoryManager {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, StoreError> {
        self.db.check_available()?;
        self.db.inner.connects.fetch_add(1, Ordering::AcqRel);
        Ok(MemoryConnection {
            db: self.db.clone(),
        })
    }

    async fn is_valid(&self, _conn: &mut MemoryConnection) -> Result<(), StoreError> {
        self.db.check_available()
    }
}

/// Session on a [`MemoryDb`]
pub struct MemoryConnection {
    db: MemoryDb,
}

fn newest_first(a: &CommentaryEntry, b: &CommentaryEntry) -> std::cmp::Ordering {
    b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id))
}

#[async_trait]
impl CommentaryStore for MemoryConnection {
    async fn list_games(&mut self) -> Result<Vec<GameSummary>, StoreError> {
        self.db.begin(MemoryOp::ListGames).await?;
        let tables = self.db.tables();

        let mut games: Vec<GameSummary> = tables
            .games
            .values()
            .map(|game| GameSummary {
                game: game.clone(),
                commentary_count: tables
                    .commentary
                    .iter()
                    .filter(|c| c.game_id == game.id)
                    .count() as i64,
            })
            .collect();
        games.sort_by(|a, b| {
            b.game
                .game_date
                .cmp(&a.game.game_date)
                .then(b.game.id.cmp(&a.game.id))
        });
        Ok(games)
    }

    async fn get_game(&mut self, game_id: i64) -> Result<Option<Game>, StoreError> {
        self.db.begin(MemoryOp::GetGame).await?;
        Ok(self.db.tables().games.get(&game_id).cloned())
    }

    async fn game_exists(&mut self, game_id: i64) -> Result<bool, StoreError> {
        self.db.begin(MemoryOp::GameExists).await?;
        Ok(self.db.tables().games.contains_key(&game_id))
    }

    async fn list_commentary(
        &mut self,
        game_id: i64,
        page: Page,
    ) -> Result<Vec<CommentaryEntry>, StoreError> {
        self.db.begin(MemoryOp::ListCommentary).await?;
        let tables = self.db.tables();

        let mut entries: Vec<CommentaryEntry> = tables
            .commentary
            .iter()
            .filter(|c| c.game_id == game_id)
            .cloned()
            .collect();
        entries.sort_by(newest_first);

        Ok(entries
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn insert_commentary(&mut self, entry: &NewCommentary) -> Result<i64, StoreError> {
        self.db.begin(MemoryOp::InsertCommentary).await?;
        let mut tables = self.db.tables();

        if !tables.games.contains_key(&entry.game_id) {
            return Err(StoreError::ForeignKey(format!(
                "commentary.game_id={} not present in games",
                entry.game_id
            )));
        }

        tables.next_commentary_id += 1;
        let id = tables.next_commentary_id;
        tables.commentary.push(CommentaryEntry {
            id,
            game_id: entry.game_id,
            message: entry.message.as_str().to_owned(),
            timestamp: entry.timestamp,
            event_type: entry.event_type.as_str().to_owned(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn insert_game(&mut self, game: &NewGame) -> Result<Game, StoreError> {
        self.db.begin(MemoryOp::InsertGame).await?;
        let mut tables = self.db.tables();

        tables.next_game_id += 1;
        let row = Game {
            id: tables.next_game_id,
            home_team: game.home_team.as_str().to_owned(),
            away_team: game.away_team.as_str().to_owned(),
            game_date: game.game_date,
            status: game.status,
            home_score: game.home_score,
            away_score: game.away_score,
            created_at: Utc::now(),
        };
        tables.games.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_game(&mut self, game: &Game) -> Result<Option<Game>, StoreError> {
        self.db.begin(MemoryOp::UpdateGame).await?;
        let mut tables = self.db.tables();

        Ok(tables.games.get_mut(&game.id).map(|row| {
            row.status = game.status;
            row.home_score = game.home_score;
            row.away_score = game.away_score;
            row.clone()
        }))
    }

    async fn aggregate_stats(&mut self) -> Result<StatsCounts, StoreError> {
        self.db.begin(MemoryOp::AggregateStats).await?;
        let tables = self.db.tables();

        let mut by_event: BTreeMap<&str, u64> = BTreeMap::new();
        for entry in &tables.commentary {
            *by_event.entry(entry.event_type.as_str()).or_default() += 1;
        }

        Ok(StatsCounts {
            total_games: tables.games.len() as u64,
            total_commentary: tables.commentary.len() as u64,
            event_breakdown: by_event
                .into_iter()
                .map(|(event_type, count)| EventCount {
                    event_type: event_type.to_owned(),
                    count,
                })
                .collect(),
        })
    }
}
