//! MemCluster — in-memory cluster snapshot.
//!
//! Holds stores and regions in plain maps with per-store indexes of the
//! regions each store leads or follows, so random region lookups are
//! O(1) after construction. Peer ids come from an `AtomicU64` counter,
//! which makes [`Cluster::alloc_peer`] safe to call from many scheduling
//! threads at once.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::Cluster;
use crate::error::{ClusterError, ClusterResult};
use crate::types::*;

/// Serialized form of a cluster snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterSnapshot {
    pub stores: Vec<StoreInfo>,
    #[serde(default)]
    pub regions: Vec<RegionInfo>,
    /// Next peer id to hand out. Derived from existing peers when absent.
    #[serde(default)]
    pub next_peer_id: Option<PeerId>,
}

/// In-memory [`Cluster`] implementation.
pub struct MemCluster {
    /// Stores ordered by id.
    stores: Vec<StoreInfo>,
    /// Store id → index into `stores`.
    store_index: HashMap<StoreId, usize>,
    regions: HashMap<RegionId, RegionInfo>,
    /// Store id → regions where that store holds a follower.
    followers: HashMap<StoreId, Vec<RegionId>>,
    /// Store id → regions where that store holds the leader.
    leaders: HashMap<StoreId, Vec<RegionId>>,
    next_peer_id: AtomicU64,
    /// Highest peer id that may be allocated.
    id_limit: u64,
}

impl MemCluster {
    /// Create an empty cluster.
    pub fn new() -> Self {
        Self {
            stores: Vec::new(),
            store_index: HashMap::new(),
            regions: HashMap::new(),
            followers: HashMap::new(),
            leaders: HashMap::new(),
            next_peer_id: AtomicU64::new(1),
            id_limit: u64::MAX,
        }
    }

    /// Build a cluster from a snapshot, validating every region.
    pub fn from_snapshot(snapshot: ClusterSnapshot) -> ClusterResult<Self> {
        let mut cluster = Self::new();
        for store in snapshot.stores {
            cluster.put_store(store);
        }
        for region in snapshot.regions {
            cluster.put_region(region)?;
        }
        if let Some(next) = snapshot.next_peer_id {
            cluster.next_peer_id.fetch_max(next, Ordering::SeqCst);
        }
        debug!(
            stores = cluster.stores.len(),
            regions = cluster.regions.len(),
            "cluster snapshot loaded"
        );
        Ok(cluster)
    }

    /// Load a JSON snapshot from disk.
    pub fn open(path: &Path) -> ClusterResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: ClusterSnapshot = serde_json::from_str(&content)
            .map_err(|e| ClusterError::Deserialize(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    /// Write the current state to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> ClusterResult<()> {
        let json = serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| ClusterError::Serialize(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn to_snapshot(&self) -> ClusterSnapshot {
        let mut regions: Vec<RegionInfo> = self.regions.values().cloned().collect();
        regions.sort_by_key(|r| r.id);
        ClusterSnapshot {
            stores: self.stores.clone(),
            regions,
            next_peer_id: Some(self.next_peer_id.load(Ordering::SeqCst)),
        }
    }

    /// Cap the peer id space; `limit` is the last id handed out.
    ///
    /// `u64::MAX` itself is never allocated: the counter parks there once
    /// the space is used up.
    pub fn with_id_limit(mut self, limit: u64) -> Self {
        self.id_limit = limit;
        self
    }

    /// Insert or replace a store.
    pub fn put_store(&mut self, store: StoreInfo) {
        if let Some(&idx) = self.store_index.get(&store.id) {
            self.stores[idx] = store;
            return;
        }
        self.stores.push(store);
        self.stores.sort_by_key(|s| s.id);
        self.store_index = self
            .stores
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id, idx))
            .collect();
    }

    /// Insert or replace a region.
    ///
    /// Rejects regions with two peers on one store or a leader that is
    /// not among the peers.
    pub fn put_region(&mut self, region: RegionInfo) -> ClusterResult<()> {
        let mut seen = Vec::with_capacity(region.peers.len());
        for peer in &region.peers {
            if seen.contains(&peer.store_id) {
                return Err(ClusterError::DuplicateStorePeer {
                    region_id: region.id,
                    store_id: peer.store_id,
                });
            }
            seen.push(peer.store_id);
        }
        if region.leader.is_some() && region.leader_peer().is_none() {
            return Err(ClusterError::InvalidLeader(region.id));
        }

        if let Some(old) = self.regions.remove(&region.id) {
            self.unindex(&old);
        }

        let max_peer = region.peers.iter().map(|p| p.id).max().unwrap_or(0);
        let next = max_peer.checked_add(1).unwrap_or(u64::MAX);
        self.next_peer_id.fetch_max(next, Ordering::SeqCst);

        for peer in &region.peers {
            let index = if region.leader == Some(peer.id) {
                &mut self.leaders
            } else {
                &mut self.followers
            };
            index.entry(peer.store_id).or_default().push(region.id);
        }
        self.regions.insert(region.id, region);
        Ok(())
    }

    pub fn get_region(&self, region_id: RegionId) -> Option<&RegionInfo> {
        self.regions.get(&region_id)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Recompute per-store leader/region counts and sizes from the regions.
    pub fn recompute_store_stats(&mut self) {
        for store in &mut self.stores {
            store.leader_count = 0;
            store.region_count = 0;
            store.leader_size = 0;
            store.region_size = 0;
        }
        for region in self.regions.values() {
            for peer in &region.peers {
                let Some(&idx) = self.store_index.get(&peer.store_id) else {
                    continue;
                };
                let store = &mut self.stores[idx];
                store.region_count += 1;
                store.region_size += region.approximate_size;
                if region.leader == Some(peer.id) {
                    store.leader_count += 1;
                    store.leader_size += region.approximate_size;
                }
            }
        }
    }

    fn unindex(&mut self, region: &RegionInfo) {
        for peer in &region.peers {
            for index in [&mut self.leaders, &mut self.followers] {
                if let Some(ids) = index.get_mut(&peer.store_id) {
                    ids.retain(|id| *id != region.id);
                }
            }
        }
    }

    fn pick_random(
        &self,
        index: &HashMap<StoreId, Vec<RegionId>>,
        store_id: StoreId,
    ) -> Option<&RegionInfo> {
        let ids = index.get(&store_id)?;
        let id = ids.choose(&mut rand::thread_rng())?;
        self.regions.get(id)
    }
}

impl Default for MemCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl Cluster for MemCluster {
    fn stores(&self) -> &[StoreInfo] {
        &self.stores
    }

    fn get_store(&self, store_id: StoreId) -> Option<&StoreInfo> {
        self.store_index.get(&store_id).map(|&idx| &self.stores[idx])
    }

    fn rand_follower_region(&self, store_id: StoreId) -> Option<&RegionInfo> {
        self.pick_random(&self.followers, store_id)
    }

    fn rand_leader_region(&self, store_id: StoreId) -> Option<&RegionInfo> {
        self.pick_random(&self.leaders, store_id)
    }

    fn alloc_peer(&self, store_id: StoreId) -> ClusterResult<Peer> {
        if !self.store_index.contains_key(&store_id) {
            return Err(ClusterError::StoreNotFound(store_id));
        }
        let limit = self.id_limit;
        let id = self
            .next_peer_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| {
                id.checked_add(1).filter(|_| id <= limit)
            })
            .map_err(|_| ClusterError::IdExhausted(limit))?;
        debug!(peer_id = id, store_id, "peer allocated");
        Ok(Peer { id, store_id })
    }
}
