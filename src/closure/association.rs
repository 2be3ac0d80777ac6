/*!
 * Signal Associations
 * Handler-to-closure bookkeeping for one wrapped object
 */

use crate::core::limits::ASSOCIATION_INITIAL_CAPACITY;
use crate::core::types::{ClosureId, SignalHandle};
use ahash::{HashMap, HashMapExt};
use log::debug;
use parking_lot::Mutex;

#[derive(Default)]
struct Associations {
    by_handle: HashMap<SignalHandle, ClosureId>,
    by_closure: HashMap<ClosureId, SignalHandle>,
}

/// Both directions of the handler/closure association
///
/// Kept under a single lock so the two maps never disagree. A closure is
/// associated with at most one handler; floating closures created through
/// `Object::closure_new` are never associated.
pub struct SignalTable {
    inner: Mutex<Associations>,
}

impl SignalTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Associations {
                by_handle: HashMap::with_capacity(ASSOCIATION_INITIAL_CAPACITY),
                by_closure: HashMap::with_capacity(ASSOCIATION_INITIAL_CAPACITY),
            }),
        }
    }

    /// Record that `handle` runs `closure`
    ///
    /// Refused (returns false) while `closure` is recorded for another
    /// handler: its identity was reused and the other record is the live one.
    pub fn associate(&self, handle: SignalHandle, closure: ClosureId) -> bool {
        let mut inner = self.inner.lock();
        if let Some(&current) = inner.by_closure.get(&closure) {
            if current != handle {
                debug!("{} already runs {}, not recording {}", current, closure, handle);
                return false;
            }
        }
        if let Some(stale) = inner.by_handle.insert(handle, closure) {
            if stale != closure {
                inner.by_closure.remove(&stale);
            }
        }
        inner.by_closure.insert(closure, handle);
        true
    }

    /// Forget a handler; returns the closure it ran
    pub fn dissociate(&self, handle: SignalHandle) -> Option<ClosureId> {
        let mut inner = self.inner.lock();
        let closure = inner.by_handle.remove(&handle)?;
        if inner.by_closure.get(&closure) == Some(&handle) {
            inner.by_closure.remove(&closure);
        }
        Some(closure)
    }

    /// Forget a closure's handler, used when the closure is finalized
    pub fn dissociate_closure(&self, closure: ClosureId) -> Option<SignalHandle> {
        let mut inner = self.inner.lock();
        let handle = inner.by_closure.remove(&closure)?;
        if inner.by_handle.get(&handle) == Some(&closure) {
            inner.by_handle.remove(&handle);
        }
        Some(handle)
    }

    pub fn closure_for(&self, handle: SignalHandle) -> Option<ClosureId> {
        self.inner.lock().by_handle.get(&handle).copied()
    }

    pub fn handle_for(&self, closure: ClosureId) -> Option<SignalHandle> {
        self.inner.lock().by_closure.get(&closure).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every association, leaving the table empty
    pub fn drain(&self) -> Vec<(SignalHandle, ClosureId)> {
        let mut inner = self.inner.lock();
        inner.by_closure.clear();
        inner.by_handle.drain().collect()
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new()
    }
}
