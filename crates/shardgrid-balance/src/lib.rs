//! shardgrid-balance — balance decisions for the ShardGrid placement scheduler.
//!
//! Given a [`Cluster`](shardgrid_cluster::Cluster) snapshot, this crate
//! decides which peer to move off an overloaded store, where a new peer
//! may go, whether a move is worth making, how many moves may run at
//! once, and which stores to skip for a while after failed attempts.
//! It does NOT execute moves; it hands back operators for the caller to
//! run.
//!
//! # Components
//!
//! - **`planner`** — Peer migration planning (evacuate / admit)
//! - **`feasibility`** — Weighted overshoot check for a proposed move
//! - **`limit`** — Concurrency limit from load spread
//! - **`taint`** — TTL suppression set with a background sweep
//! - **`selector`** / **`filter`** — Pluggable store selection
//! - **`balance_region`** — Region-count balancing scheduler
//! - **`metrics`** — Per-scheduler event counters
//! - **`config`** — `shardgrid.toml` parsing

pub mod balance_region;
pub mod config;
pub mod error;
pub mod feasibility;
pub mod filter;
pub mod limit;
pub mod metrics;
pub mod planner;
pub mod selector;
pub mod taint;

pub use balance_region::{BalanceRegionScheduler, Operator};
pub use config::{SchedulerConfig, ShardgridConfig, TaintConfig};
pub use error::{BalanceError, BalanceResult};
pub use feasibility::{should_balance, should_balance_stores};
pub use filter::{ExcludedFilter, Filter, LabelFilter, StateFilter, TaintFilter};
pub use limit::adjust_balance_limit;
pub use metrics::{CounterSink, NoopCounter, SchedulerCounter};
pub use planner::{schedule_add_peer, schedule_remove_peer};
pub use selector::{BalanceSelector, RandomSelector, RoundRobinSelector, Selector};
pub use taint::{TaintCache, TaintCacheConfig};
