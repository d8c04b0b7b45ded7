//! Incrementally maintained commentary statistics
//!
//! Seeded once from a full aggregation at startup, then updated with
//! deltas after each committed insert. Per-event-type counters are atomics
//! behind a read-mostly lock: the write lock is taken only when a new
//! event type first appears, and briefly by `snapshot` to copy a
//! consistent view.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Count of commentary entries for one event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub event_type: String,
    pub count: u64,
}

/// Aggregate totals, used both to seed the aggregator and as its snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCounts {
    pub total_games: u64,
    pub total_commentary: u64,
    /// Sorted by event type
    pub event_breakdown: Vec<EventCount>,
}

#[derive(Default)]
struct CommentaryCounters {
    total: AtomicU64,
    by_event: HashMap<String, AtomicU64>,
}

/// Running totals for games and commentary
#[derive(Default)]
pub struct StatsAggregator {
    total_games: AtomicU64,
    commentary: RwLock<CommentaryCounters>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CommentaryCounters> {
        self.commentary.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CommentaryCounters> {
        self.commentary.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace all counters with a full aggregation.
    pub fn seed(&self, counts: &StatsCounts) {
        let mut commentary = self.write();
        self.total_games.store(counts.total_games, Ordering::Release);
        commentary.total = AtomicU64::new(counts.total_commentary);
        commentary.by_event = counts
            .event_breakdown
            .iter()
            .map(|e| (e.event_type.clone(), AtomicU64::new(e.count)))
            .collect();

        info!(
            total_games = counts.total_games,
            total_commentary = counts.total_commentary,
            event_types = counts.event_breakdown.len(),
            "stats seeded"
        );
    }

    /// Record one committed game insert.
    pub fn record_game(&self) {
        self.total_games.fetch_add(1, Ordering::AcqRel);
    }

    /// Record one committed commentary insert of `event_type`.
    pub fn record_commentary(&self, event_type: &str) {
        {
            let commentary = self.read();
            if let Some(counter) = commentary.by_event.get(event_type) {
                counter.fetch_add(1, Ordering::AcqRel);
                commentary.total.fetch_add(1, Ordering::AcqRel);
                return;
            }
        }

        // First entry of this type
        let mut commentary = self.write();
        commentary
            .by_event
            .entry(event_type.to_owned())
            .or_default()
            .fetch_add(1, Ordering::AcqRel);
        commentary.total.fetch_add(1, Ordering::AcqRel);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsCounts {
        // Exclusive access so the total and the breakdown agree
        let commentary = self.write();
        let mut event_breakdown: Vec<EventCount> = commentary
            .by_event
            .iter()
            .map(|(event_type, count)| EventCount {
                event_type: event_type.clone(),
                count: count.load(Ordering::Acquire),
            })
            .collect();
        let total_commentary = commentary.total.load(Ordering::Acquire);
        drop(commentary);

        event_breakdown.sort_by(|a, b| a.event_type.cmp(&b.event_type));

        StatsCounts {
            total_games: self.total_games.load(Ordering::Acquire),
            total_commentary,
            event_breakdown,
        }
    }
}
