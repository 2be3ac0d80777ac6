/*!
 * Local Runtime
 * In-process reference implementation of the native closure/signal runtime
 *
 * Closures are reference counted and start out floating; connecting a
 * floating closure adopts that reference. Emission holds an extra reference
 * for the duration of each marshal call, so a disconnect racing an emission
 * defers finalization until the call returns. Identities of finalized
 * closures are recycled, as a native allocator would recycle addresses.
 */

use super::object::{base_signal_name, ObjectRef, ObjectType};
use super::traits::{FinalizeFn, MarshalFn, NativeRuntime};
use super::value::{NativeValue, ReturnSlot};
use super::SignalSpec;
use crate::core::errors::{NativeError, NativeResult};
use crate::core::limits::{CLOSURE_ID_ALIGN, CLOSURE_ID_BASE};
use crate::core::types::{ClosureId, Name, ObjectId, SignalHandle};
use crate::core::{ShardManager, WorkloadProfile};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

struct ClosureSlot {
    refs: u32,
    floating: bool,
    marshal: Option<MarshalFn>,
    notifiers: Vec<FinalizeFn>,
}

struct Handler {
    handle: SignalHandle,
    signal: Name,
    closure: ClosureId,
    after: bool,
}

struct ObjectSlot {
    object: ObjectRef,
    handlers: Vec<Handler>,
}

/// In-process native runtime
pub struct LocalRuntime {
    closures: DashMap<ClosureId, ClosureSlot, RandomState>,
    objects: DashMap<ObjectId, ObjectSlot, RandomState>,
    free_ids: Mutex<Vec<ClosureId>>,
    next_closure: AtomicUsize,
    next_handle: AtomicU64,
    next_object: AtomicU64,
    finalized: AtomicU64,
}

impl LocalRuntime {
    pub fn new() -> Self {
        let shards = ShardManager::shards(WorkloadProfile::Runtime);
        info!("Local runtime initialized ({} shards)", shards);
        Self {
            closures: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                shards,
            ),
            objects: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                shards,
            ),
            free_ids: Mutex::new(Vec::new()),
            next_closure: AtomicUsize::new(CLOSURE_ID_BASE),
            next_handle: AtomicU64::new(1),
            next_object: AtomicU64::new(1),
            finalized: AtomicU64::new(0),
        }
    }

    /// Instantiate an object of the given type
    pub fn new_object(&self, ty: Arc<ObjectType>) -> ObjectRef {
        let id = ObjectId::from_raw(self.next_object.fetch_add(1, Ordering::SeqCst));
        let object = ObjectRef::new(id, ty);
        self.objects.insert(
            id,
            ObjectSlot {
                object: object.clone(),
                handlers: Vec::new(),
            },
        );
        debug!("Created {}", object);
        object
    }

    /// Destroy an object, dropping every handler's closure reference
    ///
    /// Returns the number of handlers that were still connected.
    pub fn destroy_object(&self, object: ObjectId) -> NativeResult<usize> {
        let (_, slot) = self
            .objects
            .remove(&object)
            .ok_or(NativeError::UnknownObject(object))?;

        let count = slot.handlers.len();
        for handler in slot.handlers {
            if let Err(e) = self.unref(handler.closure) {
                warn!("Dropping {} of {}: {}", handler.handle, object, e);
            }
        }

        info!("Destroyed {} ({} handlers dropped)", slot.object, count);
        Ok(count)
    }

    /// Emit a signal synchronously on the calling thread
    ///
    /// Handlers connected before the default stage run first, in connection
    /// order, then the after-handlers. A handler disconnected by an earlier
    /// handler of the same emission is skipped. Returns the value left in the
    /// return slot, if the signal declares one.
    pub fn emit(
        &self,
        object: ObjectId,
        signal: &str,
        args: &[NativeValue],
    ) -> NativeResult<Option<NativeValue>> {
        let (instance, spec, handlers) = {
            let slot = self
                .objects
                .get(&object)
                .ok_or(NativeError::UnknownObject(object))?;
            let spec = self.lookup_signal(&slot.object, signal)?;

            if args.len() != spec.params().len() {
                return Err(NativeError::InvalidArguments {
                    signal: signal.into(),
                    expected: spec.params().len(),
                    got: args.len(),
                });
            }

            let mut handlers: Vec<(SignalHandle, ClosureId)> = Vec::new();
            for after in [false, true] {
                handlers.extend(
                    slot.handlers
                        .iter()
                        .filter(|h| h.after == after && handler_matches(&h.signal, signal))
                        .map(|h| (h.handle, h.closure)),
                );
            }

            (slot.object.clone(), spec, handlers)
        };

        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(NativeValue::Object(instance));
        params.extend_from_slice(args);

        let mut slot = spec.return_type().map(ReturnSlot::new);

        trace!(
            "Emitting {} on {} to {} handlers",
            signal,
            object,
            handlers.len()
        );

        for (handle, closure) in handlers {
            if !self.is_connected(object, handle) {
                continue;
            }
            self.invoke(closure, &params, slot.as_mut());
        }

        Ok(slot.and_then(|mut s| s.take()))
    }

    /// Number of handlers connected on an object
    pub fn handler_count(&self, object: ObjectId) -> usize {
        self.objects
            .get(&object)
            .map(|slot| slot.handlers.len())
            .unwrap_or(0)
    }

    /// Number of closures not yet finalized
    pub fn live_closures(&self) -> usize {
        self.closures.len()
    }

    pub fn is_live(&self, closure: ClosureId) -> bool {
        self.closures.contains_key(&closure)
    }

    /// Current reference count of a live closure
    pub fn ref_count(&self, closure: ClosureId) -> Option<u32> {
        self.closures.get(&closure).map(|slot| slot.refs)
    }

    /// Closures finalized since creation
    pub fn finalized_count(&self) -> u64 {
        self.finalized.load(Ordering::Relaxed)
    }

    fn lookup_signal(&self, object: &ObjectRef, signal: &str) -> NativeResult<SignalSpec> {
        object
            .object_type()
            .find_signal(signal)
            .cloned()
            .ok_or_else(|| NativeError::UnknownSignal {
                type_name: object.type_name().clone(),
                signal: signal.into(),
            })
    }

    fn is_connected(&self, object: ObjectId, handle: SignalHandle) -> bool {
        self.objects
            .get(&object)
            .map(|slot| slot.handlers.iter().any(|h| h.handle == handle))
            .unwrap_or(false)
    }

    /// Run one closure's marshal while holding a reference to it
    fn invoke(&self, closure: ClosureId, params: &[NativeValue], ret: Option<&mut ReturnSlot>) {
        let marshal = match self.closures.get_mut(&closure) {
            Some(mut slot) => {
                slot.refs += 1;
                slot.marshal.clone()
            }
            None => return,
        };

        match marshal {
            Some(marshal) => marshal(closure, params, ret),
            None => warn!("Closure {} has no marshal installed", closure),
        }

        if let Err(e) = self.unref(closure) {
            warn!("Failed to release {} after emission: {}", closure, e);
        }
    }

    fn unref(&self, closure: ClosureId) -> NativeResult<()> {
        let slot = match self.closures.entry(closure) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                slot.floating = false;
                slot.refs -= 1;
                if slot.refs > 0 {
                    return Ok(());
                }
                entry.remove()
            }
            Entry::Vacant(_) => return Err(NativeError::UnknownClosure(closure)),
        };

        for notify in &slot.notifiers {
            notify(closure);
        }

        self.finalized.fetch_add(1, Ordering::Relaxed);
        self.free_ids.lock().push(closure);
        trace!("Finalized {}", closure);
        Ok(())
    }

    fn allocate_id(&self) -> ClosureId {
        if let Some(id) = self.free_ids.lock().pop() {
            return id;
        }
        ClosureId::from_raw(self.next_closure.fetch_add(CLOSURE_ID_ALIGN, Ordering::SeqCst))
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRuntime for LocalRuntime {
    fn create_closure(&self) -> NativeResult<ClosureId> {
        let id = self.allocate_id();
        self.closures.insert(
            id,
            ClosureSlot {
                refs: 1,
                floating: true,
                marshal: None,
                notifiers: Vec::new(),
            },
        );
        trace!("Allocated {}", id);
        Ok(id)
    }

    fn set_meta_marshal(&self, closure: ClosureId, marshal: MarshalFn) -> NativeResult<()> {
        let mut slot = self
            .closures
            .get_mut(&closure)
            .ok_or(NativeError::UnknownClosure(closure))?;
        if slot.marshal.is_some() {
            return Err(NativeError::MarshalInstalled(closure));
        }
        slot.marshal = Some(marshal);
        Ok(())
    }

    fn add_finalize_notifier(&self, closure: ClosureId, notify: FinalizeFn) -> NativeResult<()> {
        self.closures
            .get_mut(&closure)
            .ok_or(NativeError::UnknownClosure(closure))?
            .notifiers
            .push(notify);
        Ok(())
    }

    fn release_closure(&self, closure: ClosureId) -> NativeResult<()> {
        self.unref(closure)
    }

    fn connect(
        &self,
        object: ObjectId,
        signal: &str,
        closure: ClosureId,
        after: bool,
    ) -> NativeResult<SignalHandle> {
        let mut slot = self
            .objects
            .get_mut(&object)
            .ok_or(NativeError::UnknownObject(object))?;
        self.lookup_signal(&slot.object, signal)?;

        {
            let mut closure_slot = self
                .closures
                .get_mut(&closure)
                .ok_or(NativeError::UnknownClosure(closure))?;
            if closure_slot.floating {
                closure_slot.floating = false;
            } else {
                closure_slot.refs += 1;
            }
        }

        let handle = SignalHandle::from_raw(self.next_handle.fetch_add(1, Ordering::SeqCst));
        slot.handlers.push(Handler {
            handle,
            signal: signal.into(),
            closure,
            after,
        });

        debug!(
            "Connected {} to {}::{} as {}{}",
            closure,
            slot.object,
            signal,
            handle,
            if after { " (after)" } else { "" }
        );
        Ok(handle)
    }

    fn disconnect(&self, object: ObjectId, handle: SignalHandle) -> NativeResult<()> {
        let closure = {
            let mut slot = self
                .objects
                .get_mut(&object)
                .ok_or(NativeError::UnknownObject(object))?;
            let index = slot
                .handlers
                .iter()
                .position(|h| h.handle == handle)
                .ok_or(NativeError::UnknownHandler { object, handle })?;
            slot.handlers.remove(index).closure
        };

        debug!("Disconnected {} from {}", handle, object);
        self.unref(closure)
    }

    fn query_signal(&self, object: ObjectId, signal: &str) -> Option<SignalSpec> {
        let slot = self.objects.get(&object)?;
        self.lookup_signal(&slot.object, signal).ok()
    }
}

fn handler_matches(connected: &str, emitted: &str) -> bool {
    connected == emitted || connected == base_signal_name(emitted)
}
