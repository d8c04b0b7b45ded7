//! Short-TTL read cache for the hot read endpoints
//!
//! In-memory LRU map with a per-entry expiry. Values are replaced whole on
//! `put`, so a reader sees either the old value or the new one. Values are
//! expected to be cheap to clone (`Arc`-backed).

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use tracing::debug;

/// Cache key for the aggregate game listing
pub const GAMES_LIST_KEY: &str = "games:list";

/// Key prefix covering every cached commentary page of a game
pub fn commentary_prefix(game_id: i64) -> String {
    format!("commentary:{}:", game_id)
}

/// Key for one commentary page of a game
pub fn commentary_key(game_id: i64, limit: u32, offset: u32) -> String {
    format!("commentary:{}:{}:{}", game_id, limit, offset)
}

/// Cache sizing
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            capacity: 1024,
        }
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Bounded LRU cache with per-entry TTL
pub struct ReadCache<V> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ReadCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            default_ttl: config.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a live entry, marking it most recently used.
    ///
    /// Expired entries are removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        let now = Instant::now();

        let found = match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        };
        drop(entries);

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `value` under `key` for `ttl`, evicting the least recently
    /// used entry if the cache is full.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries().put(key.into(), entry);
    }

    /// Store `value` with the default TTL.
    pub fn put_default(&self, key: impl Into<String>, value: V) {
        self.put(key, value, self.default_ttl);
    }

    /// Remove every entry whose key starts with `prefix`. Returns the count.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key.as_str());
        }
        drop(entries);

        if !doomed.is_empty() {
            debug!(prefix, removed = doomed.len(), "cache invalidated");
        }
        doomed.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        let entries = self.entries();
        CacheMetrics {
            entries: entries.len(),
            capacity: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
