/*!
 * Trampolines
 * Marshal and finalize functions installed on every bridge closure
 *
 * Both are unwind barriers: nothing raised by a host callback or a failure
 * reporter propagates into the native runtime.
 */

use super::atomic_stats::BridgeStats;
use super::object::ObjectBox;
use super::report::CallbackFailure;
use crate::closure::Callback;
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::limits::MAX_PANIC_MESSAGE_LEN;
use crate::monitoring::emission_span;
use crate::native::{finalize_fn, marshal_fn, FinalizeFn, MarshalFn, NativeValue, ReturnSlot};
use log::{debug, error, trace};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// Marshal trampoline for closures registered on `owner`
pub(crate) fn marshal(owner: Weak<ObjectBox>, stats: Arc<BridgeStats>) -> MarshalFn {
    marshal_fn(move |closure, params, ret| {
        stats.inc_emissions();

        let Some(owner) = owner.upgrade() else {
            stats.inc_skipped();
            trace!("Emission to {} after its object wrapper was dropped", closure);
            return;
        };
        let Some(callback) = owner.closures.load(closure) else {
            stats.inc_skipped();
            trace!("Emission to unregistered {}", closure);
            return;
        };

        let span = emission_span(owner.object().id(), closure, callback.label());
        let _entered = span.enter();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            dispatch(&owner, &callback, params, ret)
        }));

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(payload) => BridgeError::CallbackPanicked(panic_message(payload.as_ref())),
        };

        stats.inc_failures();
        let failure = CallbackFailure {
            object: owner.object().id(),
            closure,
            signal: callback.label().clone(),
            site: callback.site().clone(),
            error,
        };

        let bridge = owner.bridge();
        if panic::catch_unwind(AssertUnwindSafe(|| bridge.report(failure))).is_err() {
            error!("Failure reporter panicked while reporting on {}", closure);
        }
    })
}

/// Finalize trampoline: forget the closure once the runtime destroys it
pub(crate) fn finalize(owner: Weak<ObjectBox>, stats: Arc<BridgeStats>) -> FinalizeFn {
    finalize_fn(move |closure| {
        stats.inc_finalized();

        let Some(owner) = owner.upgrade() else {
            trace!("Finalized {} after its object wrapper was dropped", closure);
            return;
        };

        let teardown = panic::catch_unwind(AssertUnwindSafe(|| {
            let removed = owner.closures.delete(closure);
            let handle = owner.signals.dissociate_closure(closure);
            (removed, handle)
        }));

        match teardown {
            Ok((removed, handle)) => debug!(
                "Finalized {} on {} (registered: {}, handler: {:?})",
                closure,
                owner.object().id(),
                removed,
                handle
            ),
            Err(_) => error!("Finalize of {} panicked", closure),
        }
    })
}

/// Convert, call, and store the return value
fn dispatch(
    owner: &ObjectBox,
    callback: &Callback,
    params: &[NativeValue],
    ret: Option<&mut ReturnSlot>,
) -> BridgeResult<()> {
    let bridge = owner.bridge();
    let value = callback.invoke(params, bridge.converter(), bridge.config().arity)?;

    let Some(slot) = ret else {
        return Ok(());
    };
    if value.is_nil() {
        return Ok(());
    }

    let stored = match bridge.converter().to_native(&value, slot.ty()) {
        Some(native) => slot.set(native),
        None => false,
    };
    if stored {
        return Ok(());
    }
    Err(BridgeError::Conversion {
        position: "return value".into(),
        expected: slot.ty().name().into(),
        found: value.type_name(),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    truncate(message, MAX_PANIC_MESSAGE_LEN)
}

fn truncate(mut message: String, max: usize) -> String {
    if message.len() > max {
        let mut end = max;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    message
}
