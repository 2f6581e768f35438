//! Taint cache of stores to skip for a while after failed scheduling.
//!
//! Each entry maps a store id to the instant it was tainted. An entry is
//! logically gone once it is older than the TTL, whether or not the sweep
//! has run; reads check the age themselves. A background task owned by
//! the cache removes expired entries every GC interval so the map does
//! not grow with stale ids.
//!
//! # Concurrency model
//!
//! Entries live behind a `std::sync::RwLock` so filters can query the
//! cache synchronously from any scheduling thread. The sweep takes the
//! write lock once per tick for a single pass over the map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use shardgrid_cluster::StoreId;

use crate::error::{BalanceError, BalanceResult};

/// Default interval between sweeps.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(5);

/// Default lifetime of a taint.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Timing parameters for a [`TaintCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaintCacheConfig {
    /// How often expired entries are purged (default: 5 seconds).
    pub gc_interval: Duration,
    /// How long a taint lasts (default: 5 minutes).
    pub ttl: Duration,
}

impl Default for TaintCacheConfig {
    fn default() -> Self {
        Self {
            gc_interval: DEFAULT_GC_INTERVAL,
            ttl: DEFAULT_TTL,
        }
    }
}

impl TaintCacheConfig {
    /// The sweep must run more often than entries expire.
    pub fn validate(&self) -> BalanceResult<()> {
        if self.gc_interval.is_zero() || self.gc_interval >= self.ttl {
            return Err(BalanceError::InvalidTaintConfig {
                gc_interval: self.gc_interval,
                ttl: self.ttl,
            });
        }
        Ok(())
    }
}

type Entries = Arc<RwLock<HashMap<StoreId, Instant>>>;

/// TTL set of tainted store ids with a background sweep.
pub struct TaintCache {
    entries: Entries,
    config: TaintCacheConfig,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaintCache {
    /// Create a cache and start its sweep task on the current tokio runtime.
    pub fn new(config: TaintCacheConfig) -> BalanceResult<Self> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| BalanceError::NoRuntime)?;

        let entries: Entries = Arc::new(RwLock::new(HashMap::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = runtime.spawn(run_sweep(entries.clone(), config, shutdown_rx));

        info!(
            gc_interval_ms = config.gc_interval.as_millis() as u64,
            ttl_ms = config.ttl.as_millis() as u64,
            "taint cache started"
        );

        Ok(Self {
            entries,
            config,
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn config(&self) -> TaintCacheConfig {
        self.config
    }

    /// Taint a store, or refresh an existing taint.
    pub fn put(&self, store_id: StoreId) {
        self.write().insert(store_id, Instant::now());
        debug!(store_id, "store tainted");
    }

    /// Whether `store_id` was tainted no longer than one TTL ago.
    pub fn is_tainted(&self, store_id: StoreId) -> bool {
        let now = Instant::now();
        self.read()
            .get(&store_id)
            .is_some_and(|at| !is_expired(*at, now, self.config.ttl))
    }

    /// Drop a taint early. Returns true if a live taint was removed.
    pub fn remove(&self, store_id: StoreId) -> bool {
        let now = Instant::now();
        self.write()
            .remove(&store_id)
            .is_some_and(|at| !is_expired(at, now, self.config.ttl))
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of live (unexpired) taints.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.read()
            .values()
            .filter(|at| !is_expired(**at, now, self.config.ttl))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live tainted store ids in ascending order.
    pub fn store_ids(&self) -> Vec<StoreId> {
        let now = Instant::now();
        let mut ids: Vec<StoreId> = self
            .read()
            .iter()
            .filter(|(_, at)| !is_expired(**at, now, self.config.ttl))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Stop the sweep task. Safe to call more than once.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("taint cache stopped");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<StoreId, Instant>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<StoreId, Instant>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TaintCache {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_expired(tainted_at: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(tainted_at) > ttl
}

/// Remove every entry older than `ttl`. Returns how many were removed.
fn sweep(entries: &Entries, ttl: Duration) -> usize {
    let now = Instant::now();
    let mut map = entries.write().unwrap_or_else(PoisonError::into_inner);
    let before = map.len();
    map.retain(|_, at| !is_expired(*at, now, ttl));
    before - map.len()
}

async fn run_sweep(
    entries: Entries,
    config: TaintCacheConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let start = Instant::now() + config.gc_interval;
    let mut ticker = tokio::time::interval_at(start, config.gc_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = sweep(&entries, config.ttl);
                if removed > 0 {
                    debug!(removed, "expired taints purged");
                }
            }
            _ = shutdown.changed() => {
                debug!("taint sweep shutting down");
                break;
            }
        }
    }
}
