//! Balance error types.

use thiserror::Error;

/// Errors raised while setting up the balance core.
///
/// Planning itself never fails: an unplannable round yields `None`.
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("invalid taint cache config: gc interval {gc_interval:?} must be shorter than ttl {ttl:?}")]
    InvalidTaintConfig {
        gc_interval: std::time::Duration,
        ttl: std::time::Duration,
    },

    #[error("taint cache requires a running tokio runtime")]
    NoRuntime,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    #[error("cluster error: {0}")]
    Cluster(#[from] shardgrid_cluster::ClusterError),
}

pub type BalanceResult<T> = Result<T, BalanceError>;
