//! Dynamic balance limit.
//!
//! The number of concurrent balance operations tracks how unevenly a
//! resource is spread: the population standard deviation of per-store
//! counts, truncated, never below 1. An evenly spread cluster is moved
//! one step at a time; a skewed one can absorb more moves at once.

use shardgrid_cluster::{Cluster, ResourceKind};
use tracing::debug;

/// Maximum number of concurrent balance operations for `kind`.
///
/// Only stores that are up contribute to the sample. Always `>= 1`.
pub fn adjust_balance_limit(cluster: &dyn Cluster, kind: ResourceKind) -> u64 {
    let counts: Vec<f64> = cluster
        .stores()
        .iter()
        .filter(|s| s.is_up())
        .map(|s| s.resource_count(kind) as f64)
        .collect();

    let deviation = standard_deviation(&counts);
    let limit = (deviation as u64).max(1);
    debug!(%kind, stores = counts.len(), deviation, limit, "balance limit adjusted");
    limit
}

/// Population standard deviation. Empty input yields 0.
fn standard_deviation(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardgrid_cluster::{MemCluster, StoreInfo, StoreState};

    fn cluster(stores: &[(u64, StoreState, u64)]) -> MemCluster {
        let mut c = MemCluster::new();
        for &(id, state, regions) in stores {
            let mut s = StoreInfo::new(id);
            s.state = state;
            s.region_count = regions;
            s.leader_count = regions / 2;
            c.put_store(s);
        }
        c
    }

    #[test]
    fn identical_counts_give_one() {
        let c = cluster(&[
            (1, StoreState::Up, 40),
            (2, StoreState::Up, 40),
            (3, StoreState::Up, 40),
        ]);
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Region), 1);
    }

    #[test]
    fn empty_cluster_gives_one() {
        let c = MemCluster::new();
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Region), 1);
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Leader), 1);
    }

    #[test]
    fn single_store_gives_one() {
        let c = cluster(&[(1, StoreState::Up, 1000)]);
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Region), 1);
    }

    #[test]
    fn skew_raises_limit() {
        // Counts 0 and 20: mean 10, population deviation 10.
        let c = cluster(&[(1, StoreState::Up, 0), (2, StoreState::Up, 20)]);
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Region), 10);
        // Leader counts 0 and 10: deviation 5.
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Leader), 5);
    }

    #[test]
    fn deviation_is_truncated() {
        // Counts 0, 0, 10: mean 3.33, deviation 4.71.
        let c = cluster(&[
            (1, StoreState::Up, 0),
            (2, StoreState::Up, 0),
            (3, StoreState::Up, 10),
        ]);
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Region), 4);
    }

    #[test]
    fn stores_not_up_are_excluded() {
        let c = cluster(&[
            (1, StoreState::Up, 50),
            (2, StoreState::Up, 50),
            (3, StoreState::Down, 0),
            (4, StoreState::Offline, 500),
        ]);
        assert_eq!(adjust_balance_limit(&c, ResourceKind::Region), 1);
    }

    #[test]
    fn standard_deviation_basics() {
        assert_eq!(standard_deviation(&[]), 0.0);
        assert_eq!(standard_deviation(&[7.0]), 0.0);
        let sd = standard_deviation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.0).abs() < 1e-9);
    }
}
