/*!
 * Object Wrapper
 * Host-side handle to a native object and the closures connected through it
 */

use super::bridge::Bridge;
use super::connector;
use crate::closure::{ClosureRegistry, SignalTable};
use crate::core::errors::BridgeResult;
use crate::core::types::{CallSite, ClosureId, ObjectId, SignalHandle};
use crate::host::Value;
use crate::native::ObjectRef;
use log::{debug, info};
use std::fmt;
use std::sync::Arc;

/// Per-object bridge state
///
/// Trampolines reach this only through a `Weak`, so the native runtime never
/// keeps it alive. Dropping it disconnects whatever is still connected.
pub(crate) struct ObjectBox {
    object: ObjectRef,
    bridge: Bridge,
    pub(crate) closures: ClosureRegistry,
    pub(crate) signals: SignalTable,
}

impl ObjectBox {
    pub(crate) fn new(
        object: ObjectRef,
        bridge: Bridge,
        closures: ClosureRegistry,
        signals: SignalTable,
    ) -> Self {
        Self {
            object,
            bridge,
            closures,
            signals,
        }
    }

    pub(crate) fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub(crate) fn bridge(&self) -> &Bridge {
        &self.bridge
    }
}

impl Drop for ObjectBox {
    fn drop(&mut self) {
        let id = self.object.id();
        let handlers = self.signals.drain();
        let runtime = self.bridge.runtime();

        for (handle, closure) in &handlers {
            self.closures.delete(*closure);
            if let Err(e) = runtime.disconnect(id, *handle) {
                debug!("Teardown of {} on {}: {}", handle, id, e);
            }
        }

        let leftover = self.closures.clear();
        self.bridge.forget(id);

        if !handlers.is_empty() || leftover > 0 {
            info!(
                "Released {} ({} handlers disconnected, {} floating closures dropped)",
                self.object,
                handlers.len(),
                leftover
            );
        }
    }
}

/// Host handle to a wrapped native object
///
/// Clones share one registry and association table. The last clone to go
/// disconnects every handler still connected through it.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectBox>,
}

impl Object {
    pub(crate) fn from_box(inner: Arc<ObjectBox>) -> Self {
        Self { inner }
    }

    /// Connect a callback to `signal`, running before the default handler
    ///
    /// `signal` may carry a detail ("notify::label"). The callback must be a
    /// host function; with receiver checks on, its first parameter must accept
    /// this object's type.
    #[track_caller]
    pub fn connect(&self, signal: &str, callback: impl Into<Value>) -> BridgeResult<SignalHandle> {
        let site = CallSite::capture();
        connector::connect(&self.inner, signal, callback.into(), false, site)
    }

    /// Connect a callback to `signal`, running after the default handler
    #[track_caller]
    pub fn connect_after(
        &self,
        signal: &str,
        callback: impl Into<Value>,
    ) -> BridgeResult<SignalHandle> {
        let site = CallSite::capture();
        connector::connect(&self.inner, signal, callback.into(), true, site)
    }

    /// Disconnect a handler; unknown or already disconnected handles are a no-op
    pub fn disconnect(&self, handle: SignalHandle) -> BridgeResult<()> {
        connector::disconnect(&self.inner, handle)
    }

    /// Register a floating closure not tied to any signal
    ///
    /// The caller hands the identity to the native runtime, which owns its
    /// single reference.
    #[track_caller]
    pub fn closure_new(&self, callback: impl Into<Value>) -> BridgeResult<ClosureId> {
        let site = CallSite::capture();
        connector::closure_new(&self.inner, callback.into(), site)
    }

    pub fn object(&self) -> &ObjectRef {
        self.inner.object()
    }

    pub fn id(&self) -> ObjectId {
        self.inner.object().id()
    }

    pub fn bridge(&self) -> &Bridge {
        self.inner.bridge()
    }

    /// Handlers currently connected through this wrapper
    pub fn handler_count(&self) -> usize {
        self.inner.signals.len()
    }

    /// Closures whose callbacks are still registered
    pub fn closure_count(&self) -> usize {
        self.inner.closures.len()
    }

    pub fn is_registered(&self, closure: ClosureId) -> bool {
        self.inner.closures.contains(closure)
    }

    /// Closure a handler runs, while it is connected
    pub fn closure_for(&self, handle: SignalHandle) -> Option<ClosureId> {
        self.inner.signals.closure_for(handle)
    }

    /// True if both handles wrap the same state
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("object", &self.inner.object().to_string())
            .field("handlers", &self.handler_count())
            .field("closures", &self.closure_count())
            .finish()
    }
}
