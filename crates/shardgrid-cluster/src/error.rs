//! Error types for the cluster model.

use thiserror::Error;

use crate::types::{RegionId, StoreId};

/// Result type alias for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors raised by a cluster-state collaborator.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("store not found: {0}")]
    StoreNotFound(StoreId),

    #[error("region {region_id} has more than one peer on store {store_id}")]
    DuplicateStorePeer { region_id: RegionId, store_id: StoreId },

    #[error("region {0} leader is not one of its peers")]
    InvalidLeader(RegionId),

    #[error("peer id space exhausted (limit {0})")]
    IdExhausted(u64),

    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}
