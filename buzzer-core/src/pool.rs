//! Bounded connection pool with scoped acquisition
//!
//! - Capacity is a fair (FIFO) semaphore with `max_size` permits
//! - Idle connections live in a mutex-guarded deque; the lock is only held
//!   for push/pop, never across an `.await`
//! - `PooledConnection` is a guard: dropping it returns the connection,
//!   including on error paths and when the owning future is cancelled
//! - Connectivity loss puts the pool in a degraded state for a short
//!   back-off window during which `acquire` fails fast

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Opens and checks connections for a [`Pool`].
#[async_trait]
pub trait ConnectionManager: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open a new connection.
    async fn connect(&self) -> Result<Self::Connection, StoreError>;

    /// Check that an idle connection still works (e.g. a ping).
    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), StoreError>;

    /// Cheap synchronous check run when a connection is released.
    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Pool sizing and timing
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connections kept open even when idle
    pub min_size: usize,
    /// Hard cap on live connections
    pub max_size: usize,
    /// How long `acquire` waits for a free connection
    pub acquire_timeout: Duration,
    /// Idle connections older than this are closed and replaced
    pub max_idle_time: Duration,
    /// Idle connections older than this are validated on checkout
    pub test_after_idle: Duration,
    /// How long `acquire` fails fast after connectivity loss
    pub degraded_backoff: Duration,
    /// Period of the background maintenance task
    pub maintenance_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            max_size: 10,
            acquire_timeout: Duration::from_secs(2),
            max_idle_time: Duration::from_secs(300),
            test_after_idle: Duration::from_secs(30),
            degraded_backoff: Duration::from_secs(1),
            maintenance_interval: Duration::from_secs(30),
        }
    }
}

/// Pool acquisition error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("timed out after {0:?} waiting for a connection")]
    Exhausted(Duration),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("pool is closed")]
    Closed,
}

/// Point-in-time pool counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub min_size: usize,
    pub max_size: usize,
    /// Live connections (idle + lent out + being opened)
    pub open: usize,
    pub idle: usize,
    /// Callers currently holding a slot
    pub in_use: usize,
    pub degraded: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One unit of the live-connection count, released on drop.
struct Slot {
    open: Arc<AtomicUsize>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A connection together with its slot in the live count.
struct Tracked<C> {
    conn: C,
    _slot: Slot,
}

struct Idle<C> {
    conn: Tracked<C>,
    since: Instant,
}

struct Shared<M: ConnectionManager> {
    manager: M,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<Idle<M::Connection>>>,
    open: Arc<AtomicUsize>,
    degraded_until: Mutex<Option<Instant>>,
}

impl<M: ConnectionManager> Shared<M> {
    /// Reserve a slot for a new connection unless `max_size` is reached.
    fn try_reserve(&self) -> Option<Slot> {
        let mut current = self.open.load(Ordering::Acquire);
        loop {
            if current >= self.config.max_size {
                return None;
            }
            match self.open.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(Slot {
                        open: Arc::clone(&self.open),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Open a connection, giving up after `limit`.
    async fn connect_within(&self, limit: Duration) -> Result<M::Connection, StoreError> {
        match tokio::time::timeout(limit, self.manager.connect()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::unavailable(format!(
                "no connection after {}ms",
                limit.as_millis()
            ))),
        }
    }

    /// Validate an idle connection, giving up after `limit`.
    async fn validate_within(
        &self,
        conn: &mut M::Connection,
        limit: Duration,
    ) -> Result<(), StoreError> {
        match tokio::time::timeout(limit, self.manager.is_valid(conn)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::unavailable(format!(
                "validation did not finish within {}ms",
                limit.as_millis()
            ))),
        }
    }

    fn pop_idle(&self) -> Option<Idle<M::Connection>> {
        lock(&self.idle).pop_back()
    }

    fn push_idle(&self, conn: Tracked<M::Connection>) {
        lock(&self.idle).push_back(Idle {
            conn,
            since: Instant::now(),
        });
    }

    fn is_degraded(&self) -> bool {
        matches!(*lock(&self.degraded_until), Some(until) if Instant::now() < until)
    }

    fn check_degraded(&self) -> Result<(), PoolError> {
        if self.is_degraded() {
            return Err(PoolError::Unavailable("connection pool is degraded".into()));
        }
        Ok(())
    }

    fn mark_degraded(&self, err: &StoreError) {
        let until = Instant::now() + self.config.degraded_backoff;
        *lock(&self.degraded_until) = Some(until);

        // Idle connections share the fate of the one that failed
        let drained: Vec<_> = lock(&self.idle).drain(..).collect();
        warn!(
            error = %err,
            discarded = drained.len(),
            backoff_ms = self.config.degraded_backoff.as_millis() as u64,
            "database connectivity lost, pool degraded"
        );
    }

    fn clear_degraded(&self) {
        let mut degraded = lock(&self.degraded_until);
        if degraded.take().is_some() {
            info!("database reachable again, pool recovered");
        }
    }

    /// Remove idle connections past `max_idle_time`, returning how many.
    fn reap_expired(&self) -> usize {
        let expired: VecDeque<_> = {
            let mut idle = lock(&self.idle);
            let (keep, expired): (VecDeque<_>, VecDeque<_>) = idle
                .drain(..)
                .partition(|entry| entry.since.elapsed() < self.config.max_idle_time);
            *idle = keep;
            expired
        };
        expired.len()
    }
}

/// Bounded pool of connections produced by a [`ConnectionManager`]
pub struct Pool<M: ConnectionManager> {
    shared: Arc<Shared<M>>,
}

impl<M: ConnectionManager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: ConnectionManager> Pool<M> {
    /// Create a pool. No connections are opened until [`Pool::warm_up`] or
    /// the first [`Pool::acquire`].
    ///
    /// `max_size` is at least 1 and `min_size` never exceeds it.
    pub fn new(manager: M, mut config: PoolConfig) -> Self {
        config.max_size = config.max_size.max(1);
        config.min_size = config.min_size.min(config.max_size);

        Self {
            shared: Arc::new(Shared {
                manager,
                permits: Arc::new(Semaphore::new(config.max_size)),
                idle: Mutex::new(VecDeque::with_capacity(config.max_size)),
                open: Arc::new(AtomicUsize::new(0)),
                degraded_until: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn manager(&self) -> &M {
        &self.shared.manager
    }

    /// Acquire a connection, waiting up to the configured acquire timeout.
    pub async fn acquire(&self) -> Result<PooledConnection<M>, PoolError> {
        self.acquire_timeout(self.shared.config.acquire_timeout).await
    }

    /// Acquire a connection within `timeout`.
    ///
    /// The budget covers the wait for capacity, validation of an idle
    /// connection and opening a new one. Waiters are served in arrival
    /// order. Fails fast with [`PoolError::Unavailable`] while the pool is
    /// degraded; a connect or validation that outlives the budget degrades it.
    pub async fn acquire_timeout(
        &self,
        timeout: Duration,
    ) -> Result<PooledConnection<M>, PoolError> {
        let shared = &self.shared;
        shared.check_degraded()?;

        let started = tokio::time::Instant::now();
        let remaining = || timeout.saturating_sub(started.elapsed());

        let permit =
            match tokio::time::timeout(timeout, Arc::clone(&shared.permits).acquire_owned()).await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(PoolError::Closed),
                Err(_) => {
                    debug!(timeout_ms = timeout.as_millis() as u64, "pool exhausted");
                    return Err(PoolError::Exhausted(timeout));
                }
            };

        // The database may have gone away while we were queued
        shared.check_degraded()?;

        loop {
            if let Some(Idle { mut conn, since }) = shared.pop_idle() {
                let idle_for = since.elapsed();
                if idle_for >= shared.config.max_idle_time {
                    debug!(idle_ms = idle_for.as_millis() as u64, "closing stale idle connection");
                    continue;
                }
                if idle_for >= shared.config.test_after_idle {
                    if let Err(err) = shared.validate_within(&mut conn.conn, remaining()).await {
                        if err.is_connectivity() {
                            shared.mark_degraded(&err);
                            return Err(PoolError::Unavailable(err.to_string()));
                        }
                        debug!(error = %err, "discarding connection that failed validation");
                        continue;
                    }
                }
                return Ok(PooledConnection::new(conn, permit, Arc::clone(shared)));
            }

            let Some(slot) = shared.try_reserve() else {
                // Every live connection is accounted for, so one is on its
                // way back to the idle set
                tokio::task::yield_now().await;
                continue;
            };

            return match shared.connect_within(remaining()).await {
                Ok(conn) => {
                    shared.clear_degraded();
                    debug!(open = shared.open.load(Ordering::Acquire), "opened connection");
                    Ok(PooledConnection::new(
                        Tracked { conn, _slot: slot },
                        permit,
                        Arc::clone(shared),
                    ))
                }
                Err(err) => {
                    shared.mark_degraded(&err);
                    Err(PoolError::Unavailable(err.to_string()))
                }
            };
        }
    }

    /// Return a connection to the pool. Equivalent to dropping it.
    pub fn release(&self, conn: PooledConnection<M>) {
        drop(conn);
    }

    /// Record connectivity loss observed outside the pool (e.g. a query
    /// failing with a network error).
    pub fn report_connectivity_loss(&self, err: &StoreError) {
        self.shared.mark_degraded(err);
    }

    pub fn is_degraded(&self) -> bool {
        self.shared.is_degraded()
    }

    /// Open connections until `min_size` are live. Returns how many were opened.
    pub async fn warm_up(&self) -> Result<usize, PoolError> {
        let shared = &self.shared;
        let mut opened = 0;

        while !shared.is_degraded() && shared.open.load(Ordering::Acquire) < shared.config.min_size
        {
            let Ok(permit) = Arc::clone(&shared.permits).try_acquire_owned() else {
                break;
            };
            let Some(slot) = shared.try_reserve() else {
                break;
            };

            match shared.connect_within(shared.config.acquire_timeout).await {
                Ok(conn) => {
                    shared.push_idle(Tracked { conn, _slot: slot });
                    shared.clear_degraded();
                    opened += 1;
                }
                Err(err) => {
                    shared.mark_degraded(&err);
                    return Err(PoolError::Unavailable(err.to_string()));
                }
            }
            drop(permit);
        }

        Ok(opened)
    }

    /// Close idle connections past `max_idle_time` and top the pool back up
    /// to `min_size`.
    pub async fn run_maintenance(&self) -> MaintenanceReport {
        let closed = self.shared.reap_expired();
        let opened = match self.warm_up().await {
            Ok(opened) => opened,
            Err(err) => {
                debug!(error = %err, "maintenance could not replenish pool");
                0
            }
        };

        if closed > 0 || opened > 0 {
            debug!(closed, opened, "pool maintenance");
        }
        MaintenanceReport { closed, opened }
    }

    /// Run [`Pool::run_maintenance`] every `maintenance_interval` until the
    /// pool is dropped.
    pub fn spawn_maintenance(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.config.maintenance_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                Pool { shared }.run_maintenance().await;
            }
        })
    }

    /// Stop handing out connections and close the idle ones.
    pub fn close(&self) {
        self.shared.permits.close();
        let drained: Vec<_> = lock(&self.shared.idle).drain(..).collect();
        info!(closed = drained.len(), "connection pool closed");
    }

    pub fn status(&self) -> PoolStatus {
        let shared = &self.shared;
        PoolStatus {
            min_size: shared.config.min_size,
            max_size: shared.config.max_size,
            open: shared.open.load(Ordering::Acquire),
            idle: lock(&shared.idle).len(),
            in_use: shared
                .config
                .max_size
                .saturating_sub(shared.permits.available_permits()),
            degraded: shared.is_degraded(),
        }
    }
}

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaintenanceReport {
    pub closed: usize,
    pub opened: usize,
}

/// A connection lent out by a [`Pool`]; returned when dropped.
pub struct PooledConnection<M: ConnectionManager> {
    conn: Option<Tracked<M::Connection>>,
    broken: bool,
    shared: Arc<Shared<M>>,
    // Released after `drop` has put the connection back
    _permit: OwnedSemaphorePermit,
}

impl<M: ConnectionManager> PooledConnection<M> {
    fn new(conn: Tracked<M::Connection>, permit: OwnedSemaphorePermit, shared: Arc<Shared<M>>) -> Self {
        Self {
            conn: Some(conn),
            broken: false,
            shared,
            _permit: permit,
        }
    }

    /// Discard this connection on release instead of reusing it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl<M: ConnectionManager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn.as_ref().expect("connection present until drop").conn
    }
}

impl<M: ConnectionManager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn.as_mut().expect("connection present until drop").conn
    }
}

impl<M: ConnectionManager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        let Some(mut tracked) = self.conn.take() else {
            return;
        };

        if self.broken || self.shared.manager.has_broken(&mut tracked.conn) {
            debug!("discarding broken connection");
            return;
        }
        if self.shared.is_degraded() {
            return;
        }
        self.shared.push_idle(tracked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        validations: AtomicUsize,
        live: Arc<AtomicUsize>,
        peak: AtomicUsize,
        failing: AtomicBool,
        stale: AtomicBool,
        hanging: AtomicBool,
    }

    struct TestConn {
        live: Arc<AtomicUsize>,
    }

    impl Drop for TestConn {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct TestManager {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl ConnectionManager for TestManager {
        type Connection = TestConn;

        async fn connect(&self) -> Result<TestConn, StoreError> {
            let c = &self.counters;
            c.connects.fetch_add(1, Ordering::SeqCst);
            if c.hanging.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if c.failing.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("connection refused"));
            }
            let live = c.live.fetch_add(1, Ordering::SeqCst) + 1;
            c.peak.fetch_max(live, Ordering::SeqCst);
            Ok(TestConn {
                live: Arc::clone(&c.live),
            })
        }

        async fn is_valid(&self, _conn: &mut TestConn) -> Result<(), StoreError> {
            self.counters.validations.fetch_add(1, Ordering::SeqCst);
            if self.counters.hanging.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.counters.stale.load(Ordering::SeqCst) {
                return Err(StoreError::other("stale session"));
            }
            Ok(())
        }
    }

    fn config(min: usize, max: usize) -> PoolConfig {
        PoolConfig {
            min_size: min,
            max_size: max,
            acquire_timeout: Duration::from_secs(5),
            max_idle_time: Duration::from_secs(60),
            test_after_idle: Duration::from_secs(60),
            degraded_backoff: Duration::from_millis(50),
            maintenance_interval: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn released_connection_is_reused() {
        let manager = TestManager::default();
        let pool = Pool::new(manager.clone(), config(0, 2));

        let conn = pool.acquire().await.unwrap();
        pool.release(conn);
        let _conn = pool.acquire().await.unwrap();

        assert_eq!(manager.counters.connects.load(Ordering::SeqCst), 1);
        let status = pool.status();
        assert_eq!(status.open, 1);
        assert_eq!(status.in_use, 1);
        assert_eq!(status.idle, 0);
    }

    #[tokio::test]
    async fn exhausted_after_timeout() {
        let pool = Pool::new(TestManager::default(), config(0, 1));
        let _held = pool.acquire().await.unwrap();

        let err = pool
            .acquire_timeout(Duration::from_millis(20))
            .await
            .err()
            .unwrap();
        assert_eq!(err, PoolError::Exhausted(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn waiters_are_served_in_arrival_order() {
        let pool = Pool::new(TestManager::default(), config(0, 1));
        let held = pool.acquire().await.unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..3 {
            let pool = pool.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let conn = pool.acquire().await.unwrap();
                order.lock().unwrap().push(i);
                tokio::time::sleep(Duration::from_millis(5)).await;
                drop(conn);
            }));
            // Let the waiter queue up before spawning the next one
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_max_size() {
        let manager = TestManager::default();
        let pool = Pool::new(manager.clone(), config(0, 3));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let conn = pool.acquire().await.unwrap();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    drop(conn);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(manager.counters.peak.load(Ordering::SeqCst) <= 3);
        assert!(pool.status().open <= 3);
    }

    #[tokio::test]
    async fn broken_connection_is_discarded() {
        let manager = TestManager::default();
        let pool = Pool::new(manager.clone(), config(0, 2));

        let mut conn = pool.acquire().await.unwrap();
        conn.mark_broken();
        drop(conn);

        assert_eq!(pool.status().open, 0);
        assert_eq!(manager.counters.live.load(Ordering::SeqCst), 0);

        let _conn = pool.acquire().await.unwrap();
        assert_eq!(manager.counters.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn degraded_pool_fails_fast_then_recovers() {
        let manager = TestManager::default();
        let pool = Pool::new(manager.clone(), config(0, 2));
        manager.counters.failing.store(true, Ordering::SeqCst);

        let err = pool.acquire().await.err().unwrap();
        assert!(matches!(err, PoolError::Unavailable(_)));
        assert!(pool.is_degraded());

        // Fails without touching the database again
        let err = pool.acquire().await.err().unwrap();
        assert!(matches!(err, PoolError::Unavailable(_)));
        assert_eq!(manager.counters.connects.load(Ordering::SeqCst), 1);

        manager.counters.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;

        let _conn = pool.acquire().await.unwrap();
        assert!(!pool.is_degraded());
    }

    #[tokio::test]
    async fn connectivity_loss_drops_idle_connections() {
        let manager = TestManager::default();
        let pool = Pool::new(manager.clone(), config(2, 2));
        assert_eq!(pool.warm_up().await.unwrap(), 2);

        pool.report_connectivity_loss(&StoreError::unavailable("reset by peer"));

        assert!(pool.is_degraded());
        assert_eq!(pool.status().idle, 0);
        assert_eq!(manager.counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_idle_connection_is_validated_and_replaced() {
        let manager = TestManager::default();
        let mut cfg = config(0, 2);
        cfg.test_after_idle = Duration::ZERO;
        let pool = Pool::new(manager.clone(), cfg);

        drop(pool.acquire().await.unwrap());
        manager.counters.stale.store(true, Ordering::SeqCst);

        let _conn = pool.acquire().await.unwrap();
        assert_eq!(manager.counters.validations.load(Ordering::SeqCst), 1);
        assert_eq!(manager.counters.connects.load(Ordering::SeqCst), 2);
        assert_eq!(pool.status().open, 1);
    }

    #[tokio::test]
    async fn maintenance_replaces_expired_idle_connections() {
        let manager = TestManager::default();
        let mut cfg = config(1, 2);
        cfg.max_idle_time = Duration::from_millis(20);
        let pool = Pool::new(manager.clone(), cfg);

        assert_eq!(pool.warm_up().await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(30)).await;

        let report = pool.run_maintenance().await;
        assert_eq!(report, MaintenanceReport { closed: 1, opened: 1 });
        assert_eq!(manager.counters.connects.load(Ordering::SeqCst), 2);
        assert_eq!(pool.status().open, 1);
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_database_fails_within_acquire_timeout() {
        let manager = TestManager::default();
        manager.counters.hanging.store(true, Ordering::SeqCst);
        let pool = Pool::new(manager.clone(), config(0, 2));

        let started = tokio::time::Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_secs(60),
            pool.acquire_timeout(Duration::from_millis(100)),
        )
        .await
        .expect("acquire must finish within its own timeout");

        assert!(matches!(outcome, Err(PoolError::Unavailable(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(pool.is_degraded());
        assert_eq!(pool.status().open, 0);
        assert_eq!(pool.status().in_use, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_validation_is_bounded() {
        let manager = TestManager::default();
        let mut cfg = config(0, 2);
        cfg.test_after_idle = Duration::ZERO;
        let pool = Pool::new(manager.clone(), cfg);

        drop(pool.acquire().await.unwrap());
        manager.counters.hanging.store(true, Ordering::SeqCst);

        let outcome = tokio::time::timeout(
            Duration::from_secs(60),
            pool.acquire_timeout(Duration::from_millis(100)),
        )
        .await
        .expect("acquire must finish within its own timeout");

        assert!(matches!(outcome, Err(PoolError::Unavailable(_))));
        assert_eq!(manager.counters.validations.load(Ordering::SeqCst), 1);
        assert_eq!(pool.status().open, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn warm_up_gives_up_on_unresponsive_database() {
        let manager = TestManager::default();
        manager.counters.hanging.store(true, Ordering::SeqCst);
        let mut cfg = config(2, 2);
        cfg.acquire_timeout = Duration::from_millis(100);
        let pool = Pool::new(manager, cfg);

        let outcome = tokio::time::timeout(Duration::from_secs(60), pool.warm_up())
            .await
            .expect("warm_up must finish within the acquire timeout");

        assert!(matches!(outcome, Err(PoolError::Unavailable(_))));
        assert_eq!(pool.status().open, 0);
    }

    #[tokio::test]
    async fn cancelled_holder_releases_connection() {
        let pool = Pool::new(TestManager::default(), config(0, 1));

        let holder = {
            let pool = pool.clone();
            tokio::spawn(async move {
                let _conn = pool.acquire().await.unwrap();
                std::future::pending::<()>().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pool.status().in_use, 1);

        holder.abort();
        let _ = holder.await;

        let conn = pool.acquire_timeout(Duration::from_millis(100)).await;
        assert!(conn.is_ok());
    }

    #[tokio::test]
    async fn closed_pool_rejects_acquire() {
        let pool = Pool::new(TestManager::default(), config(1, 1));
        pool.warm_up().await.unwrap();
        pool.close();

        assert_eq!(pool.status().idle, 0);
        assert_eq!(pool.acquire().await.err().unwrap(), PoolError::Closed);
    }

    #[test]
    fn sizes_are_normalized() {
        let pool = Pool::new(TestManager::default(), config(5, 0));
        assert_eq!(pool.config().max_size, 1);
        assert_eq!(pool.config().min_size, 1);
    }
}
