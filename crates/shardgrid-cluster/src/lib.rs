//! shardgrid-cluster — cluster model for the ShardGrid placement scheduler.
//!
//! Defines the stores, regions, and peers that balance decisions are made
//! over, plus the [`Cluster`] trait through which schedulers read a
//! consistent snapshot and allocate new peer identities.
//!
//! # Architecture
//!
//! ```text
//! Cluster (trait)
//!   ├── stores() / get_store()        read-only store list
//!   ├── rand_follower_region()        random region per store + role
//!   ├── rand_leader_region()
//!   └── alloc_peer()                  atomic id allocation (fallible)
//!
//! MemCluster
//!   └── in-memory snapshot, JSON load/save, AtomicU64 id allocator
//! ```

pub mod cluster;
pub mod error;
pub mod memory;
pub mod types;

pub use cluster::Cluster;
pub use error::{ClusterError, ClusterResult};
pub use memory::{ClusterSnapshot, MemCluster};
pub use types::*;
