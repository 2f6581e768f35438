//! shardgridd — the ShardGrid balancing daemon.
//!
//! Loads a JSON cluster snapshot and runs the region balancer over it:
//! - `plan` runs one scheduling round and prints the resulting operator
//! - `run` schedules on an interval, applying each operator to the
//!   in-memory snapshot, until Ctrl-C or a round budget is reached
//! - `limit` prints the balance limit for a resource kind
//!
//! # Usage
//!
//! ```text
//! shardgridd plan --snapshot cluster.json --config shardgrid.toml
//! shardgridd run --snapshot cluster.json --rounds 10 --save after.json
//! shardgridd limit --snapshot cluster.json --kind leader
//! ```

mod simulate;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn};

use shardgrid_balance::{
    BalanceRegionScheduler, SchedulerCounter, ShardgridConfig, TaintCache, adjust_balance_limit,
};
use shardgrid_cluster::{MemCluster, ResourceKind};

#[derive(Parser)]
#[command(name = "shardgridd", about = "ShardGrid balancing daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single scheduling round and print the operator as JSON.
    Plan {
        /// Cluster snapshot (JSON).
        #[arg(long)]
        snapshot: PathBuf,

        /// Optional shardgrid.toml.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Schedule periodically, applying operators to the loaded snapshot.
    Run {
        #[arg(long)]
        snapshot: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many rounds.
        #[arg(long)]
        rounds: Option<u64>,

        /// Write the final snapshot here on exit.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Print the balance limit for a resource kind.
    Limit {
        #[arg(long)]
        snapshot: PathBuf,

        #[arg(long, value_enum, default_value = "region")]
        kind: KindArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Leader,
    Region,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Leader => ResourceKind::Leader,
            KindArg::Region => ResourceKind::Region,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Plan { snapshot, config } => plan(&snapshot, config.as_deref()),
        Command::Run {
            snapshot,
            config,
            rounds,
            save,
        } => run(&snapshot, config.as_deref(), rounds, save.as_deref()).await,
        Command::Limit { snapshot, kind } => {
            let cluster = load_cluster(&snapshot)?;
            println!("{}", adjust_balance_limit(&cluster, kind.into()));
            Ok(())
        }
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "info,shardgridd=debug,shardgrid_balance=debug,shardgrid_cluster=debug",
        )
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ShardgridConfig> {
    match path {
        Some(path) => ShardgridConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ShardgridConfig::default()),
    }
}

/// Open a snapshot. Store statistics are derived from the regions when
/// the snapshot lists any.
fn load_cluster(path: &Path) -> anyhow::Result<MemCluster> {
    let mut cluster =
        MemCluster::open(path).with_context(|| format!("loading snapshot {}", path.display()))?;
    if cluster.region_count() > 0 {
        cluster.recompute_store_stats();
    }
    Ok(cluster)
}

fn plan(snapshot: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let cluster = load_cluster(snapshot)?;

    let taint = Arc::new(TaintCache::new(config.taint.to_cache_config())?);
    let scheduler = BalanceRegionScheduler::new(taint.clone(), config.scheduler.max_replicas);
    let counter = SchedulerCounter::new();

    let operator = scheduler.schedule(&cluster, &counter);
    taint.close();

    let out = serde_json::json!({
        "operator": operator,
        "limit": scheduler.limit(),
        "tainted": taint.store_ids(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn run(
    snapshot: &Path,
    config: Option<&Path>,
    rounds: Option<u64>,
    save: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let mut cluster = load_cluster(snapshot)?;

    let taint = Arc::new(TaintCache::new(config.taint.to_cache_config())?);
    let scheduler = BalanceRegionScheduler::new(taint.clone(), config.scheduler.max_replicas);
    let counter = SchedulerCounter::new();

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl-C, running until the round budget");
            }
        }
    });

    let interval = Duration::from_secs(config.scheduler.interval_secs.max(1));
    let mut ticker = tokio::time::interval(interval);
    info!(interval_secs = interval.as_secs(), ?rounds, "balancer started");

    let mut completed = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let applied = simulate::run_round(&mut cluster, &scheduler, &counter)?;
                completed += 1;
                info!(round = completed, applied, limit = scheduler.limit(), "round complete");
                if rounds.is_some_and(|max| completed >= max) {
                    break;
                }
            }
            _ = shutdown_signalled(&mut shutdown_rx) => break,
        }
    }

    taint.close();
    if let Some(path) = save {
        cluster
            .save(path)
            .with_context(|| format!("saving snapshot {}", path.display()))?;
        info!(path = %path.display(), "snapshot saved");
    }

    print!("{}", counter.render_prometheus());
    info!(rounds = completed, "balancer stopped");
    Ok(())
}

/// Resolves once `true` is sent. A dropped sender never resolves.
async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_does_not_signal_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        let waited =
            tokio::time::timeout(Duration::from_secs(60), shutdown_signalled(&mut rx)).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sent_true_signals_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = tx.send(true);
            // Keep the sender alive past the send.
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let waited =
            tokio::time::timeout(Duration::from_secs(30), shutdown_signalled(&mut rx)).await;
        assert!(waited.is_ok());
    }
}
