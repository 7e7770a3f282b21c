//! Gateway statistics tracking.
//!
//! Process-local, read-only observability counters. They are exported by the
//! `/metrics` and `/status` endpoints and never consulted by the pipeline, so
//! requests stay independent of each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use strum::IntoEnumIterator;

use super::types::OutcomeType;

/// Thread-safe outcome counters.
///
/// Every `OutcomeType` is initialized to zero on creation, so the map is never
/// mutated after construction and lookups need no lock.
pub struct GatewayStats {
    outcomes: HashMap<OutcomeType, AtomicUsize>,
    started_at: Instant,
}

impl GatewayStats {
    pub fn new() -> Self {
        let mut outcomes = HashMap::new();
        for outcome in OutcomeType::iter() {
            outcomes.insert(outcome, AtomicUsize::new(0));
        }

        GatewayStats {
            outcomes,
            started_at: Instant::now(),
        }
    }

    /// Increment an outcome counter.
    pub fn increment(&self, outcome: OutcomeType) {
        if let Some(counter) = self.outcomes.get(&outcome) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in GatewayStats initialization.",
                outcome
            );
        }
    }

    /// Get the count for an outcome. Returns 0 for unknown outcomes.
    pub fn get(&self, outcome: OutcomeType) -> usize {
        self.outcomes
            .get(&outcome)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Requests that ended in a redirect or a 400.
    pub fn total_requests(&self) -> usize {
        self.get(OutcomeType::Forwarded)
            + self.get(OutcomeType::DivertedDeadLink)
            + self.get(OutcomeType::DivertedProblematicRedirect)
            + self.get(OutcomeType::Rejected)
    }

    /// Seconds since the counters were created.
    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Snapshot of all counters in declaration order.
    pub fn snapshot(&self) -> Vec<(OutcomeType, usize)> {
        OutcomeType::iter().map(|o| (o, self.get(o))).collect()
    }
}

impl Default for GatewayStats {
    fn default() -> Self {
        Self::new()
    }
}
