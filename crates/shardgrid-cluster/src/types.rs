//! Domain types for the cluster model.
//!
//! These types describe a point-in-time view of the cluster: the stores
//! (nodes) that host replicas and the regions (replicated partitions)
//! spread across them. All types are serializable to/from JSON so a
//! snapshot can be captured to disk and replayed.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a store in the cluster.
pub type StoreId = u64;

/// Unique identifier for a region.
pub type RegionId = u64;

/// Unique identifier for a peer (one replica of a region).
pub type PeerId = u64;

// ── Resource kind ─────────────────────────────────────────────────

/// The dimension of load being balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Number of region leaders hosted by a store.
    Leader,
    /// Number of region replicas hosted by a store.
    Region,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Leader => f.write_str("leader"),
            ResourceKind::Region => f.write_str("region"),
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────

/// Liveness of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// Serving and accepting new replicas.
    #[default]
    Up,
    /// Being drained; still serving, not accepting new replicas.
    Offline,
    /// Not reachable.
    Down,
}

/// A cluster node capable of hosting replicas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreInfo {
    pub id: StoreId,
    #[serde(default)]
    pub state: StoreState,
    /// Arbitrary labels (zone, rack, host) for placement constraints.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub leader_count: u64,
    #[serde(default)]
    pub region_count: u64,
    /// Sum of approximate sizes of led regions (MiB).
    #[serde(default)]
    pub leader_size: u64,
    /// Sum of approximate sizes of hosted regions (MiB).
    #[serde(default)]
    pub region_size: u64,
    /// Relative capacity for leaders. Zero marks the store unschedulable.
    #[serde(default = "default_weight")]
    pub leader_weight: f64,
    /// Relative capacity for regions. Zero marks the store unschedulable.
    #[serde(default = "default_weight")]
    pub region_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl StoreInfo {
    /// A store that is up, unlabeled, empty, and weighted 1.0 for both kinds.
    pub fn new(id: StoreId) -> Self {
        Self {
            id,
            state: StoreState::Up,
            labels: HashMap::new(),
            leader_count: 0,
            region_count: 0,
            leader_size: 0,
            region_size: 0,
            leader_weight: default_weight(),
            region_weight: default_weight(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.state == StoreState::Up
    }

    pub fn is_down(&self) -> bool {
        self.state == StoreState::Down
    }

    pub fn resource_count(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Leader => self.leader_count,
            ResourceKind::Region => self.region_count,
        }
    }

    pub fn resource_size(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Leader => self.leader_size,
            ResourceKind::Region => self.region_size,
        }
    }

    pub fn resource_weight(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Leader => self.leader_weight,
            ResourceKind::Region => self.region_weight,
        }
    }

    /// Weighted load for `kind`: size divided by weight.
    ///
    /// Returns `None` when the weight is zero (no comparable score).
    pub fn resource_score(&self, kind: ResourceKind) -> Option<f64> {
        let weight = self.resource_weight(kind);
        if weight <= 0.0 {
            return None;
        }
        Some(self.resource_size(kind) as f64 / weight)
    }
}

// ── Region / Peer ─────────────────────────────────────────────────

/// One replica of a region, bound to exactly one store.
///
/// A peer carries no region id: membership and role come from the
/// [`RegionInfo`] that lists it, so a freshly allocated peer can exist
/// before it is attached anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub store_id: StoreId,
}

/// Role of a peer within its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    Leader,
    Follower,
}

/// A replicated partition of the dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionInfo {
    pub id: RegionId,
    /// Ordered replica set; at most one peer per store.
    pub peers: Vec<Peer>,
    /// Id of the leader peer, if one has been elected.
    #[serde(default)]
    pub leader: Option<PeerId>,
    /// Approximate region size (MiB).
    #[serde(default)]
    pub approximate_size: u64,
}

impl RegionInfo {
    pub fn leader_peer(&self) -> Option<&Peer> {
        let leader = self.leader?;
        self.peers.iter().find(|p| p.id == leader)
    }

    /// The peer of this region residing on `store_id`.
    pub fn store_peer(&self, store_id: StoreId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.store_id == store_id)
    }

    pub fn peer_role(&self, store_id: StoreId) -> Option<PeerRole> {
        let peer = self.store_peer(store_id)?;
        if self.leader == Some(peer.id) {
            Some(PeerRole::Leader)
        } else {
            Some(PeerRole::Follower)
        }
    }

    /// Ids of every store holding a peer of this region.
    pub fn store_ids(&self) -> Vec<StoreId> {
        self.peers.iter().map(|p| p.store_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> RegionInfo {
        RegionInfo {
            id: 7,
            peers: vec![
                Peer { id: 71, store_id: 1 },
                Peer { id: 72, store_id: 2 },
                Peer { id: 73, store_id: 3 },
            ],
            leader: Some(72),
            approximate_size: 96,
        }
    }

    #[test]
    fn peer_role_follows_leader_id() {
        let r = region();
        assert_eq!(r.peer_role(2), Some(PeerRole::Leader));
        assert_eq!(r.peer_role(1), Some(PeerRole::Follower));
        assert_eq!(r.peer_role(9), None);
        assert_eq!(r.leader_peer().map(|p| p.store_id), Some(2));
    }

    #[test]
    fn resource_score_none_for_zero_weight() {
        let mut s = StoreInfo::new(1);
        s.region_size = 300;
        s.region_weight = 2.0;
        assert_eq!(s.resource_score(ResourceKind::Region), Some(150.0));

        s.region_weight = 0.0;
        assert_eq!(s.resource_score(ResourceKind::Region), None);
    }

    #[test]
    fn store_defaults_from_json() {
        let s: StoreInfo =
            serde_json::from_str(r#"{"id": 4, "leader_count": 2, "region_count": 5}"#).unwrap();
        assert!(s.is_up());
        assert_eq!(s.region_weight, 1.0);
        assert_eq!(s.resource_count(ResourceKind::Leader), 2);
        assert_eq!(s.resource_count(ResourceKind::Region), 5);
    }

    #[test]
    fn resource_kind_display() {
        assert_eq!(ResourceKind::Leader.to_string(), "leader");
        assert_eq!(ResourceKind::Region.to_string(), "region");
    }
}
