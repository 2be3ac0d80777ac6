/*!
 * Shard Configuration
 *
 * CPU-aware shard counts for the bridge's concurrent maps. Closure registries
 * are created once per wrapped object, so most of them see a handful of
 * entries and little contention; the runtime-wide closure table in the local
 * runtime sees every emission and every finalization.
 */

use std::sync::OnceLock;

static SHARD_MANAGER: OnceLock<ShardManager> = OnceLock::new();

/// Hardware-aware shard count calculator
#[derive(Debug, Clone)]
pub struct ShardManager {
    cpu_count: usize,
}

impl ShardManager {
    fn instance() -> &'static Self {
        SHARD_MANAGER.get_or_init(|| {
            let cpu_count = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or_else(|_| {
                    log::warn!("Failed to detect CPU count, defaulting to 4");
                    4
                });

            log::debug!("ShardManager initialized: {} CPUs", cpu_count);
            Self { cpu_count }
        })
    }

    /// Shard count for a workload profile
    ///
    /// Always a power of two within `[MIN_SHARDS, MAX_SHARDS]`, as required by
    /// `DashMap::with_capacity_and_hasher_and_shard_amount`.
    pub fn shards(profile: WorkloadProfile) -> usize {
        let base = Self::instance().cpu_count;

        let calculated = match profile {
            WorkloadProfile::Runtime => base * 4,
            WorkloadProfile::PerObject => base / 2,
        };

        calculated
            .next_power_of_two()
            .clamp(MIN_SHARDS, MAX_SHARDS)
    }

    /// CPU count detected at initialization
    pub fn cpu_count() -> usize {
        Self::instance().cpu_count
    }
}

const MIN_SHARDS: usize = 4;
const MAX_SHARDS: usize = 256;

/// Workload characterization for shard count calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadProfile {
    /// Process-wide tables touched by every emission (native closure table)
    Runtime,

    /// Per-object closure registries
    PerObject,
}
