//! Region-count balancing scheduler.
//!
//! Each round moves at most one peer from the most loaded store to the
//! least loaded store that does not already hold the region. A source
//! whose peer cannot be placed anywhere is tainted so the next rounds
//! look at other stores first.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, info};

use shardgrid_cluster::{Cluster, PeerId, RegionId, ResourceKind, StoreId};

use crate::feasibility::should_balance_stores;
use crate::filter::{ExcludedFilter, Filter, StateFilter, TaintFilter};
use crate::limit::adjust_balance_limit;
use crate::metrics::CounterSink;
use crate::planner::{schedule_add_peer, schedule_remove_peer};
use crate::selector::BalanceSelector;
use crate::taint::TaintCache;

/// Name used for counters and logs.
pub const SCHEDULER_NAME: &str = "balance-region-scheduler";

/// A proposed peer move. The caller adds `new_peer_id` on `to_store`,
/// then removes the region's peer on `from_store`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub desc: String,
    pub kind: ResourceKind,
    pub region_id: RegionId,
    pub from_store: StoreId,
    pub to_store: StoreId,
    pub new_peer_id: PeerId,
}

pub struct BalanceRegionScheduler {
    taint: Arc<TaintCache>,
    selector: BalanceSelector,
    limit: AtomicU64,
    max_replicas: usize,
}

impl BalanceRegionScheduler {
    pub fn new(taint: Arc<TaintCache>, max_replicas: usize) -> Self {
        let selector = BalanceSelector::new(ResourceKind::Region)
            .with_filter(Box::new(TaintFilter::new(taint.clone())))
            .with_filter(Box::new(StateFilter));
        Self {
            taint,
            selector,
            limit: AtomicU64::new(1),
            max_replicas,
        }
    }

    pub fn name(&self) -> &'static str {
        SCHEDULER_NAME
    }

    pub fn kind(&self) -> ResourceKind {
        ResourceKind::Region
    }

    /// Current concurrency limit, as of the last successful round.
    pub fn limit(&self) -> u64 {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn is_schedule_allowed(&self, in_flight: u64) -> bool {
        in_flight < self.limit()
    }

    /// Recompute the limit from the current spread of region counts.
    pub fn refresh_limit(&self, cluster: &dyn Cluster) -> u64 {
        let limit = adjust_balance_limit(cluster, self.kind());
        self.limit.store(limit, Ordering::Relaxed);
        limit
    }

    /// Run one scheduling round.
    pub fn schedule(&self, cluster: &dyn Cluster, counter: &dyn CounterSink) -> Option<Operator> {
        counter.inc(SCHEDULER_NAME, "schedule");

        let (region, old_peer) =
            schedule_remove_peer(cluster, SCHEDULER_NAME, &self.selector, &[], counter)?;

        if region.peers.len() != self.max_replicas {
            debug!(
                region_id = region.id,
                peers = region.peers.len(),
                expected = self.max_replicas,
                "region has abnormal replica count"
            );
            counter.inc(SCHEDULER_NAME, "abnormal_replica");
            return None;
        }

        let exclude = ExcludedFilter::targets(region.store_ids());
        let filters: [&dyn Filter; 2] = [&exclude, &StateFilter];
        let Some(new_peer) = schedule_add_peer(cluster, &self.selector, &filters) else {
            debug!(
                region_id = region.id,
                store_id = old_peer.store_id,
                "no replacement store, tainting source"
            );
            self.taint.put(old_peer.store_id);
            counter.inc(SCHEDULER_NAME, "no_replacement");
            return None;
        };

        let source = cluster.get_store(old_peer.store_id)?;
        let target = cluster.get_store(new_peer.store_id)?;
        if !should_balance_stores(source, target, self.kind(), region.approximate_size as f64) {
            debug!(
                region_id = region.id,
                from_store = source.id,
                to_store = target.id,
                "move would overshoot, skipping"
            );
            counter.inc(SCHEDULER_NAME, "skip");
            return None;
        }

        let limit = self.refresh_limit(cluster);
        counter.inc(SCHEDULER_NAME, "new_operator");
        info!(
            region_id = region.id,
            from_store = source.id,
            to_store = target.id,
            new_peer_id = new_peer.id,
            limit,
            "balance operator created"
        );

        Some(Operator {
            desc: "balance-region".to_string(),
            kind: self.kind(),
            region_id: region.id,
            from_store: source.id,
            to_store: target.id,
            new_peer_id: new_peer.id,
        })
    }
}
