//! Applies balance operators to an in-memory snapshot.

use anyhow::Context;
use tracing::debug;

use shardgrid_balance::{BalanceRegionScheduler, CounterSink, Operator};
use shardgrid_cluster::{MemCluster, Peer};

/// Schedule and apply operators until the scheduler's limit is reached or
/// a round yields nothing. Returns how many operators were applied.
pub fn run_round(
    cluster: &mut MemCluster,
    scheduler: &BalanceRegionScheduler,
    counter: &dyn CounterSink,
) -> anyhow::Result<u64> {
    let mut in_flight = 0;
    while scheduler.is_schedule_allowed(in_flight) {
        let Some(op) = scheduler.schedule(&*cluster, counter) else {
            break;
        };
        println!("{}", serde_json::to_string(&op)?);
        apply(cluster, &op)?;
        in_flight += 1;
    }
    Ok(in_flight)
}

/// Add the new peer on the target and drop the peer on the source.
/// Leadership passes to the first remaining peer if the leader moved.
pub fn apply(cluster: &mut MemCluster, op: &Operator) -> anyhow::Result<()> {
    let mut region = cluster
        .get_region(op.region_id)
        .cloned()
        .with_context(|| format!("region {} not in snapshot", op.region_id))?;

    let removed = region
        .store_peer(op.from_store)
        .copied()
        .with_context(|| format!("region {} has no peer on store {}", op.region_id, op.from_store))?;
    region.peers.retain(|p| p.id != removed.id);
    region.peers.push(Peer {
        id: op.new_peer_id,
        store_id: op.to_store,
    });
    if region.leader == Some(removed.id) {
        region.leader = region.peers.first().map(|p| p.id);
    }

    cluster.put_region(region)?;
    cluster.recompute_store_stats();
    debug!(
        region_id = op.region_id,
        from_store = op.from_store,
        to_store = op.to_store,
        "operator applied"
    );
    Ok(())
}
