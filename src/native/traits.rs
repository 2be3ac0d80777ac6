/*!
 * Native Runtime Interface
 * What the bridge consumes from the reference-counted object/signal runtime
 */

use super::object::SignalSpec;
use super::value::{NativeValue, ReturnSlot};
use crate::core::errors::NativeResult;
use crate::core::types::{ClosureId, ObjectId, SignalHandle};
use std::sync::Arc;

/// Meta-marshal installed on a closure, called once per emission
pub type MarshalFn = Arc<dyn Fn(ClosureId, &[NativeValue], Option<&mut ReturnSlot>) + Send + Sync>;

/// Finalize notifier, called exactly once when the runtime destroys a closure
pub type FinalizeFn = Arc<dyn Fn(ClosureId) + Send + Sync>;

/// Box a closure as a [`MarshalFn`]
pub fn marshal_fn<F>(f: F) -> MarshalFn
where
    F: Fn(ClosureId, &[NativeValue], Option<&mut ReturnSlot>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Box a closure as a [`FinalizeFn`]
pub fn finalize_fn<F>(f: F) -> FinalizeFn
where
    F: Fn(ClosureId) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Closure and signal operations of the native runtime
///
/// Implementations must not hold internal locks while calling a marshal or a
/// finalize notifier: both may re-enter the runtime (connect, disconnect,
/// release) from inside the call.
pub trait NativeRuntime: Send + Sync {
    /// Allocate a closure holding one floating reference
    fn create_closure(&self) -> NativeResult<ClosureId>;

    /// Install the function invoked on every emission reaching the closure
    fn set_meta_marshal(&self, closure: ClosureId, marshal: MarshalFn) -> NativeResult<()>;

    /// Add a notifier invoked when the closure is destroyed
    fn add_finalize_notifier(&self, closure: ClosureId, notify: FinalizeFn) -> NativeResult<()>;

    /// Drop one reference; the closure is finalized when none remain
    fn release_closure(&self, closure: ClosureId) -> NativeResult<()>;

    /// Connect the closure to a (detailed) signal, before or after the default handler
    fn connect(
        &self,
        object: ObjectId,
        signal: &str,
        closure: ClosureId,
        after: bool,
    ) -> NativeResult<SignalHandle>;

    /// Disconnect a handler; its closure reference is dropped
    fn disconnect(&self, object: ObjectId, handle: SignalHandle) -> NativeResult<()>;

    /// Signature of a signal, if the runtime knows it
    fn query_signal(&self, object: ObjectId, signal: &str) -> Option<SignalSpec>;
}
