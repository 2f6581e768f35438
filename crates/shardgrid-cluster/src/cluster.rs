//! The read-only snapshot contract consumed by schedulers.

use crate::error::ClusterResult;
use crate::types::{Peer, RegionInfo, StoreId, StoreInfo};

/// A consistent, read-only view of cluster state for one planning call.
///
/// Implementations own store and region data; callers never lock it.
/// The only mutating operation is [`Cluster::alloc_peer`], which must be
/// atomic across concurrent callers.
pub trait Cluster: Send + Sync {
    /// Every store known to the snapshot, in a stable order.
    fn stores(&self) -> &[StoreInfo];

    fn get_store(&self, store_id: StoreId) -> Option<&StoreInfo>;

    /// A random region that has a follower peer on `store_id`.
    fn rand_follower_region(&self, store_id: StoreId) -> Option<&RegionInfo>;

    /// A random region whose leader peer is on `store_id`.
    fn rand_leader_region(&self, store_id: StoreId) -> Option<&RegionInfo>;

    /// Stores currently holding a peer of `region`.
    fn region_stores(&self, region: &RegionInfo) -> Vec<&StoreInfo> {
        region
            .peers
            .iter()
            .filter_map(|p| self.get_store(p.store_id))
            .collect()
    }

    /// Allocate a new peer identity bound to `store_id`.
    ///
    /// The peer is not attached to any region.
    fn alloc_peer(&self, store_id: StoreId) -> ClusterResult<Peer>;
}
