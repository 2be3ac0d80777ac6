/*!
 * Closure Registry
 * Per-object map from native closure identity to its callable wrapper
 */

use super::callback::Callback;
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::limits::REGISTRY_INITIAL_CAPACITY;
use crate::core::types::ClosureId;
use crate::core::{ShardManager, WorkloadProfile};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, trace};
use std::sync::Arc;

/// Closure registry of one wrapped object
///
/// Entries are weak in the sense that matters across the boundary: the
/// native closure owns the lifetime, the registry only answers "which
/// callable belongs to this identity" until finalization removes it.
/// `load` hands out a clone of the entry's `Arc` for the duration of one
/// invocation; no shard lock is held while the callable runs.
pub struct ClosureRegistry {
    entries: DashMap<ClosureId, Arc<Callback>, RandomState>,
}

impl ClosureRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                REGISTRY_INITIAL_CAPACITY,
                RandomState::new(),
                ShardManager::shards(WorkloadProfile::PerObject),
            ),
        }
    }

    /// Register the callable for a freshly created closure
    ///
    /// A live entry under the same identity means the native side reused an
    /// identity before finalizing it. That is reported loudly, asserted in
    /// debug builds, and the live entry is left untouched.
    pub fn register(&self, closure: ClosureId, callback: Arc<Callback>) -> BridgeResult<()> {
        match self.entries.entry(closure) {
            Entry::Occupied(existing) => {
                error!(
                    "Closure {} registered twice (live callback from {}, new from {})",
                    closure,
                    existing.get().site(),
                    callback.site()
                );
                debug_assert!(false, "closure {} is already registered", closure);
                Err(BridgeError::DuplicateClosure(closure))
            }
            Entry::Vacant(slot) => {
                debug!("Registered {} for {}", closure, callback.label());
                slot.insert(callback);
                Ok(())
            }
        }
    }

    /// Callable for a closure, if it is still registered
    #[inline]
    pub fn load(&self, closure: ClosureId) -> Option<Arc<Callback>> {
        self.entries.get(&closure).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a closure's entry; returns whether one was present
    pub fn delete(&self, closure: ClosureId) -> bool {
        let removed = self.entries.remove(&closure).is_some();
        if removed {
            debug!("Deleted {}", closure);
        } else {
            trace!("Delete of {} found nothing", closure);
        }
        removed
    }

    pub fn contains(&self, closure: ClosureId) -> bool {
        self.entries.contains_key(&closure)
    }

    /// True if `closure` is registered to exactly this callback instance
    pub fn holds(&self, closure: ClosureId, callback: &Arc<Callback>) -> bool {
        self.entries
            .get(&closure)
            .map(|entry| Arc::ptr_eq(entry.value(), callback))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; returns how many were removed
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

impl Default for ClosureRegistry {
    fn default() -> Self {
        Self::new()
    }
}
