//! Scheduler event counters.
//!
//! Planning outcomes (no store, no region, new operator, ...) are counted
//! per `(scheduler, reason)` pair. Counting is fire-and-forget: a sink
//! never fails the caller. [`SchedulerCounter`] keeps the counts in memory
//! and renders them in the Prometheus text exposition format.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// No qualifying source store.
pub const REASON_NO_STORE: &str = "no_store";
/// The selected source store hosts no region.
pub const REASON_NO_REGION: &str = "no_region";

/// Sink for scheduler event counts.
pub trait CounterSink: Send + Sync {
    fn inc(&self, scheduler: &str, reason: &str);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCounter;

impl CounterSink for NoopCounter {
    fn inc(&self, _scheduler: &str, _reason: &str) {}
}

/// In-memory counter keyed by scheduler name and reason.
#[derive(Debug, Default)]
pub struct SchedulerCounter {
    counts: Mutex<BTreeMap<(String, String), u64>>,
}

impl SchedulerCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for one `(scheduler, reason)` pair.
    pub fn get(&self, scheduler: &str, reason: &str) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(scheduler.to_string(), reason.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// All counts, ordered by scheduler then reason.
    pub fn snapshot(&self) -> Vec<(String, String, u64)> {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|((s, r), n)| (s.clone(), r.clone(), *n))
            .collect()
    }

    /// Render all counts as a Prometheus counter family.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        out.push_str("# HELP shardgrid_scheduler_events_total Scheduler planning outcomes.\n");
        out.push_str("# TYPE shardgrid_scheduler_events_total counter\n");
        for (scheduler, reason, n) in self.snapshot() {
            out.push_str(&format!(
                "shardgrid_scheduler_events_total{{scheduler=\"{scheduler}\",type=\"{reason}\"}} {n}\n"
            ));
        }
        out
    }
}

impl CounterSink for SchedulerCounter {
    fn inc(&self, scheduler: &str, reason: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts
            .entry((scheduler.to_string(), reason.to_string()))
            .or_insert(0) += 1;
    }
}
