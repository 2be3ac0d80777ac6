/*!
 * Bridge Statistics
 * Lock-free counters updated on the connect and emission paths
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic bridge counters
///
/// Shared between the bridge and every trampoline it installs, so emission
/// paths can count without reaching back into the bridge.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct BridgeStats {
    connects: AtomicU64,
    disconnects: AtomicU64,
    emissions: AtomicU64,
    skipped_emissions: AtomicU64,
    failures: AtomicU64,
    finalized: AtomicU64,
}

impl BridgeStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn inc_connects(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_disconnects(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Hot path, once per marshal invocation
    #[inline(always)]
    pub fn inc_emissions(&self) {
        self.emissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Emission reached a closure whose entry or owner was already gone
    #[inline(always)]
    pub fn inc_skipped(&self) {
        self.skipped_emissions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_finalized(&self) {
        self.finalized.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    ///
    /// Counters are read independently; under concurrent updates the
    /// snapshot may not be consistent across fields.
    #[inline]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connects: self.connects.load(Ordering::Acquire),
            disconnects: self.disconnects.load(Ordering::Acquire),
            emissions: self.emissions.load(Ordering::Acquire),
            skipped_emissions: self.skipped_emissions.load(Ordering::Acquire),
            failures: self.failures.load(Ordering::Acquire),
            finalized: self.finalized.load(Ordering::Acquire),
        }
    }
}

/// Serializable view of [`BridgeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub connects: u64,
    pub disconnects: u64,
    pub emissions: u64,
    pub skipped_emissions: u64,
    pub failures: u64,
    pub finalized: u64,
}
