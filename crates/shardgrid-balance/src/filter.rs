//! Store filters: predicates that narrow store selection.
//!
//! A filter answers separately for the two roles a store can play in a
//! move: giving up a peer (source) and receiving one (target). Filters
//! compose by slice; a store must be admitted by every filter.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use shardgrid_cluster::{Cluster, StoreId, StoreInfo};

use crate::taint::TaintCache;

/// A store admission predicate.
pub trait Filter: Send + Sync {
    /// Short name used in trace output.
    fn name(&self) -> &'static str;

    fn admit_source(&self, cluster: &dyn Cluster, store: &StoreInfo) -> bool;

    fn admit_target(&self, cluster: &dyn Cluster, store: &StoreInfo) -> bool;
}

/// True if every filter admits `store` as a source.
pub fn admit_source(filters: &[&dyn Filter], cluster: &dyn Cluster, store: &StoreInfo) -> bool {
    filters.iter().all(|f| {
        let ok = f.admit_source(cluster, store);
        if !ok {
            trace!(filter = f.name(), store_id = store.id, "source rejected");
        }
        ok
    })
}

/// True if every filter admits `store` as a target.
pub fn admit_target(filters: &[&dyn Filter], cluster: &dyn Cluster, store: &StoreInfo) -> bool {
    filters.iter().all(|f| {
        let ok = f.admit_target(cluster, store);
        if !ok {
            trace!(filter = f.name(), store_id = store.id, "target rejected");
        }
        ok
    })
}

// ── Excluded ──────────────────────────────────────────────────────

/// Rejects explicitly listed stores.
#[derive(Debug, Clone, Default)]
pub struct ExcludedFilter {
    sources: HashSet<StoreId>,
    targets: HashSet<StoreId>,
}

impl ExcludedFilter {
    pub fn new(
        sources: impl IntoIterator<Item = StoreId>,
        targets: impl IntoIterator<Item = StoreId>,
    ) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            targets: targets.into_iter().collect(),
        }
    }

    /// Exclude `targets` as destinations only.
    pub fn targets(targets: impl IntoIterator<Item = StoreId>) -> Self {
        Self::new(std::iter::empty(), targets)
    }
}

impl Filter for ExcludedFilter {
    fn name(&self) -> &'static str {
        "exclude"
    }

    fn admit_source(&self, _cluster: &dyn Cluster, store: &StoreInfo) -> bool {
        !self.sources.contains(&store.id)
    }

    fn admit_target(&self, _cluster: &dyn Cluster, store: &StoreInfo) -> bool {
        !self.targets.contains(&store.id)
    }
}

// ── State ─────────────────────────────────────────────────────────

/// Targets must be up; sources must not be down.
///
/// Offline (draining) stores are valid sources so their peers can be
/// moved away.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateFilter;

impl Filter for StateFilter {
    fn name(&self) -> &'static str {
        "state"
    }

    fn admit_source(&self, _cluster: &dyn Cluster, store: &StoreInfo) -> bool {
        !store.is_down()
    }

    fn admit_target(&self, _cluster: &dyn Cluster, store: &StoreInfo) -> bool {
        store.is_up()
    }
}

// ── Taint ─────────────────────────────────────────────────────────

/// Rejects recently tainted stores as sources.
///
/// A taint records that evacuating the store found no replacement, so
/// the store stays a valid destination.
#[derive(Clone)]
pub struct TaintFilter {
    cache: Arc<TaintCache>,
}

impl TaintFilter {
    pub fn new(cache: Arc<TaintCache>) -> Self {
        Self { cache }
    }
}

impl Filter for TaintFilter {
    fn name(&self) -> &'static str {
        "taint"
    }

    fn admit_source(&self, _cluster: &dyn Cluster, store: &StoreInfo) -> bool {
        !self.cache.is_tainted(store.id)
    }

    fn admit_target(&self, _cluster: &dyn Cluster, _store: &StoreInfo) -> bool {
        true
    }
}

// ── Label ─────────────────────────────────────────────────────────

/// Targets must carry every required label with a matching value.
#[derive(Debug, Clone, Default)]
pub struct LabelFilter {
    required: HashMap<String, String>,
}

impl LabelFilter {
    pub fn new(required: HashMap<String, String>) -> Self {
        Self { required }
    }
}

impl Filter for LabelFilter {
    fn name(&self) -> &'static str {
        "label"
    }

    fn admit_source(&self, _cluster: &dyn Cluster, _store: &StoreInfo) -> bool {
        true
    }

    fn admit_target(&self, _cluster: &dyn Cluster, store: &StoreInfo) -> bool {
        self.required
            .iter()
            .all(|(k, v)| store.labels.get(k).is_some_and(|sv| sv == v))
    }
}
