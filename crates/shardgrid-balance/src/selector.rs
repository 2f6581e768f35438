//! Store selectors, pluggable strategies for picking a source or target.
//!
//! A selector sees the full store list plus caller-supplied filters and
//! returns at most one store per call. Selectors may also carry filters
//! of their own; a store is a candidate only if both sets admit it.
//!
//! - **`BalanceSelector`** — most loaded source, least loaded target
//! - **`RandomSelector`** — uniform choice among candidates
//! - **`RoundRobinSelector`** — rotating choice, lock-free

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

use shardgrid_cluster::{Cluster, ResourceKind, StoreInfo};

use crate::filter::{self, Filter};

/// Chooses one store to give up a peer or to receive one.
pub trait Selector: Send + Sync {
    fn select_source<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo>;

    fn select_target<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo>;
}

/// Stores admitted as sources by both the selector's own and the caller's filters.
fn source_candidates<'a>(
    own: &[Box<dyn Filter>],
    cluster: &dyn Cluster,
    stores: &'a [StoreInfo],
    filters: &[&dyn Filter],
) -> Vec<&'a StoreInfo> {
    stores
        .iter()
        .filter(|s| own.iter().all(|f| f.admit_source(cluster, s)))
        .filter(|s| filter::admit_source(filters, cluster, s))
        .collect()
}

fn target_candidates<'a>(
    own: &[Box<dyn Filter>],
    cluster: &dyn Cluster,
    stores: &'a [StoreInfo],
    filters: &[&dyn Filter],
) -> Vec<&'a StoreInfo> {
    stores
        .iter()
        .filter(|s| own.iter().all(|f| f.admit_target(cluster, s)))
        .filter(|s| filter::admit_target(filters, cluster, s))
        .collect()
}

// ── Balance ───────────────────────────────────────────────────────

/// Picks the store with the highest weighted score as source and the one
/// with the lowest as target.
///
/// A zero-weight store outranks every weighted store as a source and is
/// never chosen as a target. Ties go to the lower store id.
pub struct BalanceSelector {
    kind: ResourceKind,
    filters: Vec<Box<dyn Filter>>,
}

impl BalanceSelector {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl Selector for BalanceSelector {
    fn select_source<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo> {
        let mut best: Option<(&StoreInfo, f64)> = None;
        for store in source_candidates(&self.filters, cluster, stores, filters) {
            let score = store.resource_score(self.kind).unwrap_or(f64::INFINITY);
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((store, score));
            }
        }
        best.map(|(s, _)| s)
    }

    fn select_target<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo> {
        let mut best: Option<(&StoreInfo, f64)> = None;
        for store in target_candidates(&self.filters, cluster, stores, filters) {
            let Some(score) = store.resource_score(self.kind) else {
                continue;
            };
            if best.is_none_or(|(_, b)| score < b) {
                best = Some((store, score));
            }
        }
        best.map(|(s, _)| s)
    }
}

// ── Random ────────────────────────────────────────────────────────

/// Picks uniformly among admitted stores.
#[derive(Default)]
pub struct RandomSelector {
    filters: Vec<Box<dyn Filter>>,
}

impl RandomSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }
}

impl Selector for RandomSelector {
    fn select_source<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo> {
        source_candidates(&self.filters, cluster, stores, filters)
            .choose(&mut rand::thread_rng())
            .copied()
    }

    fn select_target<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo> {
        target_candidates(&self.filters, cluster, stores, filters)
            .choose(&mut rand::thread_rng())
            .copied()
    }
}

// ── Round robin ───────────────────────────────────────────────────

/// Rotates through admitted stores.
///
/// Uses `AtomicUsize` for lock-free concurrent selection. The counter is
/// shared by both roles and wraps around the current candidate count, so
/// it adapts when the candidate set grows or shrinks.
pub struct RoundRobinSelector {
    counter: AtomicUsize,
    filters: Vec<Box<dyn Filter>>,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Select the next index, wrapping around `count`.
    ///
    /// Returns `None` if count is zero.
    fn next(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(idx % count)
    }

    /// Reset the rotation to the first candidate.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for RoundRobinSelector {
    fn select_source<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo> {
        let candidates = source_candidates(&self.filters, cluster, stores, filters);
        self.next(candidates.len()).map(|i| candidates[i])
    }

    fn select_target<'a>(
        &self,
        cluster: &dyn Cluster,
        stores: &'a [StoreInfo],
        filters: &[&dyn Filter],
    ) -> Option<&'a StoreInfo> {
        let candidates = target_candidates(&self.filters, cluster, stores, filters);
        self.next(candidates.len()).map(|i| candidates[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ExcludedFilter, StateFilter};
    use shardgrid_cluster::{MemCluster, StoreId, StoreState};

    fn cluster(stores: &[(StoreId, u64, f64)]) -> MemCluster {
        let mut c = MemCluster::new();
        for &(id, size, weight) in stores {
            let mut s = StoreInfo::new(id);
            s.region_size = size;
            s.region_weight = weight;
            c.put_store(s);
        }
        c
    }

    fn ids(picks: &[Option<&StoreInfo>]) -> Vec<Option<StoreId>> {
        picks.iter().map(|p| p.map(|s| s.id)).collect()
    }

    #[test]
    fn balance_picks_heaviest_source_and_lightest_target() {
        let c = cluster(&[(1, 100, 1.0), (2, 300, 1.0), (3, 50, 1.0)]);
        let sel = BalanceSelector::new(ResourceKind::Region);

        let src = sel.select_source(&c, c.stores(), &[]);
        let dst = sel.select_target(&c, c.stores(), &[]);
        assert_eq!(ids(&[src, dst]), vec![Some(2), Some(3)]);
    }

    #[test]
    fn balance_uses_weighted_score() {
        // Store 2 holds more data but has four times the capacity.
        let c = cluster(&[(1, 100, 1.0), (2, 300, 4.0)]);
        let sel = BalanceSelector::new(ResourceKind::Region);

        assert_eq!(sel.select_source(&c, c.stores(), &[]).map(|s| s.id), Some(1));
        assert_eq!(sel.select_target(&c, c.stores(), &[]).map(|s| s.id), Some(2));
    }

    #[test]
    fn balance_zero_weight_is_source_never_target() {
        let c = cluster(&[(1, 0, 0.0), (2, 500, 1.0), (3, 10, 1.0)]);
        let sel = BalanceSelector::new(ResourceKind::Region);

        assert_eq!(sel.select_source(&c, c.stores(), &[]).map(|s| s.id), Some(1));
        assert_eq!(sel.select_target(&c, c.stores(), &[]).map(|s| s.id), Some(3));

        let only_zero = cluster(&[(1, 0, 0.0)]);
        assert!(sel.select_target(&only_zero, only_zero.stores(), &[]).is_none());
    }

    #[test]
    fn balance_ties_go_to_lowest_id() {
        let c = cluster(&[(3, 100, 1.0), (1, 100, 1.0), (2, 100, 1.0)]);
        let sel = BalanceSelector::new(ResourceKind::Region);

        assert_eq!(sel.select_source(&c, c.stores(), &[]).map(|s| s.id), Some(1));
        assert_eq!(sel.select_target(&c, c.stores(), &[]).map(|s| s.id), Some(1));
    }

    #[test]
    fn own_and_caller_filters_both_apply() {
        let mut c = cluster(&[(1, 100, 1.0), (2, 300, 1.0), (3, 50, 1.0)]);
        let mut down = StoreInfo::new(4);
        down.state = StoreState::Down;
        down.region_size = 1000;
        c.put_store(down);

        let sel = BalanceSelector::new(ResourceKind::Region).with_filter(Box::new(StateFilter));
        let exclude = ExcludedFilter::new([2], [3]);

        let src = sel.select_source(&c, c.stores(), &[&exclude]);
        let dst = sel.select_target(&c, c.stores(), &[&exclude]);
        assert_eq!(ids(&[src, dst]), vec![Some(1), Some(1)]);
    }

    #[test]
    fn no_candidates_yield_none() {
        let c = cluster(&[(1, 100, 1.0)]);
        let exclude = ExcludedFilter::new([1], [1]);
        let selectors: Vec<Box<dyn Selector>> = vec![
            Box::new(BalanceSelector::new(ResourceKind::Region)),
            Box::new(RandomSelector::new()),
            Box::new(RoundRobinSelector::new()),
        ];
        for sel in selectors {
            assert!(sel.select_source(&c, c.stores(), &[&exclude]).is_none());
            assert!(sel.select_target(&c, c.stores(), &[&exclude]).is_none());
        }
    }

    #[test]
    fn random_only_returns_candidates() {
        let c = cluster(&[(1, 0, 1.0), (2, 0, 1.0), (3, 0, 1.0)]);
        let sel = RandomSelector::new();
        let exclude = ExcludedFilter::new([2], [2]);

        for _ in 0..50 {
            let s = sel.select_source(&c, c.stores(), &[&exclude]).unwrap();
            assert_ne!(s.id, 2);
        }
    }

    #[test]
    fn round_robin_cycles_through_candidates() {
        let c = cluster(&[(1, 0, 1.0), (2, 0, 1.0), (3, 0, 1.0)]);
        let sel = RoundRobinSelector::new();

        let picks: Vec<StoreId> = (0..4)
            .filter_map(|_| sel.select_target(&c, c.stores(), &[]).map(|s| s.id))
            .collect();
        assert_eq!(picks, vec![1, 2, 3, 1]);

        sel.reset();
        assert_eq!(sel.select_source(&c, c.stores(), &[]).map(|s| s.id), Some(1));
    }

    #[test]
    fn round_robin_concurrent_safety() {
        use std::sync::Arc;
        use std::thread;

        let sel = Arc::new(RoundRobinSelector::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let sel = sel.clone();
            handles.push(thread::spawn(move || {
                (0..100).map(|_| sel.next(4).unwrap()).collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<usize> = vec![];
        for h in handles {
            all.extend(h.join().unwrap());
        }

        assert_eq!(sel.counter.load(Ordering::Relaxed), 400);
        assert!(all.iter().all(|&idx| idx < 4));
    }
}
