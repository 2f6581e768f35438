//! Balance feasibility: is a proposed move worth making?
//!
//! A move of `move_amount` from source to target is approved only if the
//! source stays strictly more loaded (per unit of weight) than the target
//! afterwards. Otherwise the next round would see the target as the
//! heavier side and propose moving it straight back.

use shardgrid_cluster::{ResourceKind, StoreInfo};

/// Decide whether moving `move_amount` of load from source to target
/// improves balance without overshooting.
///
/// - A zero-weight target is unschedulable: always `false`.
/// - A zero-weight source has no score floor: always `true`.
pub fn should_balance(
    source_load: u64,
    source_weight: f64,
    target_load: u64,
    target_weight: f64,
    move_amount: f64,
) -> bool {
    if target_weight == 0.0 {
        return false;
    }
    if source_weight == 0.0 {
        return true;
    }
    // After the move the source score must still exceed the target score.
    (source_load as f64 - move_amount) / source_weight
        > (target_load as f64 + move_amount) / target_weight
}

/// [`should_balance`] over two stores' size and weight for `kind`.
pub fn should_balance_stores(
    source: &StoreInfo,
    target: &StoreInfo,
    kind: ResourceKind,
    move_amount: f64,
) -> bool {
    should_balance(
        source.resource_size(kind),
        source.resource_weight(kind),
        target.resource_size(kind),
        target.resource_weight(kind),
        move_amount,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOADS: [u64; 5] = [0, 1, 55, 100, 10_000];
    const WEIGHTS: [f64; 4] = [0.5, 1.0, 2.0, 8.0];
    const MOVES: [f64; 4] = [0.0, 1.0, 10.0, 500.0];

    #[test]
    fn zero_target_weight_never_balances() {
        for &sl in &LOADS {
            for &sw in WEIGHTS.iter().chain([0.0].iter()) {
                for &tl in &LOADS {
                    for &mv in &MOVES {
                        assert!(!should_balance(sl, sw, tl, 0.0, mv));
                    }
                }
            }
        }
    }

    #[test]
    fn zero_source_weight_always_balances() {
        for &sl in &LOADS {
            for &tl in &LOADS {
                for &tw in &WEIGHTS {
                    for &mv in &MOVES {
                        assert!(should_balance(sl, 0.0, tl, tw, mv));
                    }
                }
            }
        }
    }

    #[test]
    fn clear_imbalance_is_approved() {
        assert!(should_balance(100, 1.0, 0, 1.0, 10.0));
    }

    #[test]
    fn overshoot_is_rejected() {
        // Post-move scores 45 vs 60: the target would become the heavier side.
        assert!(!should_balance(55, 1.0, 50, 1.0, 10.0));
    }

    #[test]
    fn equal_post_move_scores_are_rejected() {
        // 60 - 10 == 40 + 10
        assert!(!should_balance(60, 1.0, 40, 1.0, 10.0));
    }

    #[test]
    fn weights_scale_scores() {
        // Source 200/2 - 10/2 = 95, target (50 + 10)/1 = 60.
        assert!(should_balance(200, 2.0, 50, 1.0, 10.0));
        // Same loads, but the target has a quarter of the weight: 60/0.25 = 240.
        assert!(!should_balance(200, 2.0, 50, 0.25, 10.0));
    }

    #[test]
    fn stores_variant_reads_kind_fields() {
        let mut source = StoreInfo::new(1);
        source.region_size = 100;
        source.leader_size = 10;
        let target = StoreInfo::new(2);

        assert!(should_balance_stores(&source, &target, ResourceKind::Region, 10.0));
        assert!(!should_balance_stores(&source, &target, ResourceKind::Leader, 10.0));
    }
}
