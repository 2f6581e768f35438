//! Peer migration planner.
//!
//! Two entry points, one per side of a move:
//! 1. [`schedule_remove_peer`] picks a source store and a peer on it to evacuate
//! 2. [`schedule_add_peer`] picks a target store and allocates a new peer there
//!
//! Neither retries. An empty result is a normal outcome; the next
//! scheduling round tries again with a fresh snapshot.

use tracing::{debug, error};

use shardgrid_cluster::{Cluster, Peer, RegionInfo};

use crate::filter::Filter;
use crate::metrics::{CounterSink, REASON_NO_REGION, REASON_NO_STORE};
use crate::selector::Selector;

/// Choose a region and the peer to move off the selected source store.
///
/// Follower peers are preferred so leadership does not churn; a region
/// led from the source is used only when the source follows nothing.
/// Outcomes with no candidate are counted under `scheduler_name` as
/// `no_store` or `no_region`.
pub fn schedule_remove_peer<'c>(
    cluster: &'c dyn Cluster,
    scheduler_name: &str,
    selector: &dyn Selector,
    filters: &[&dyn Filter],
    counter: &dyn CounterSink,
) -> Option<(&'c RegionInfo, Peer)> {
    let stores = cluster.stores();

    let Some(source) = selector.select_source(cluster, stores, filters) else {
        debug!(scheduler = scheduler_name, "no source store selected");
        counter.inc(scheduler_name, REASON_NO_STORE);
        return None;
    };

    let region = cluster
        .rand_follower_region(source.id)
        .or_else(|| cluster.rand_leader_region(source.id));
    let Some(region) = region else {
        debug!(scheduler = scheduler_name, store_id = source.id, "source store hosts no region");
        counter.inc(scheduler_name, REASON_NO_REGION);
        return None;
    };

    let peer = *region.store_peer(source.id)?;
    debug!(
        scheduler = scheduler_name,
        store_id = source.id,
        region_id = region.id,
        peer_id = peer.id,
        role = ?region.peer_role(source.id),
        "peer selected for removal"
    );
    Some((region, peer))
}

/// Choose a target store and allocate a fresh peer on it.
///
/// The returned peer is not attached to any region; attaching it (or
/// abandoning it) is up to the caller.
pub fn schedule_add_peer(
    cluster: &dyn Cluster,
    selector: &dyn Selector,
    filters: &[&dyn Filter],
) -> Option<Peer> {
    let stores = cluster.stores();

    let target = selector.select_target(cluster, stores, filters)?;

    match cluster.alloc_peer(target.id) {
        Ok(peer) => {
            debug!(store_id = target.id, peer_id = peer.id, "peer allocated for admission");
            Some(peer)
        }
        Err(e) => {
            error!(store_id = target.id, error = %e, "failed to allocate peer");
            None
        }
    }
}
