/*!
 * Signal Connector
 * Connect and disconnect, with cleanup on every failure path
 */

use super::object::ObjectBox;
use super::trampoline;
use crate::closure::Callback;
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::types::{CallSite, ClosureId, SignalHandle};
use crate::host::Value;
use crate::native::base_signal_name;
use log::{debug, warn};
use std::sync::Arc;

/// Label used in diagnostics for closures not tied to a signal
const FLOATING_LABEL: &str = "closure";

/// Wrap, validate, register and connect a callback
pub(crate) fn connect(
    owner: &Arc<ObjectBox>,
    signal: &str,
    value: Value,
    after: bool,
    site: CallSite,
) -> BridgeResult<SignalHandle> {
    let callback = Arc::new(Callback::from_value(value, site, signal)?);
    if base_signal_name(signal).is_empty() {
        return Err(callback.fail("signal name is empty"));
    }

    let bridge = owner.bridge();
    if bridge.config().check_receiver {
        validate(owner, &callback, signal)?;
    }

    let closure = prepare(owner, &callback)?;
    let object = owner.object().id();
    let runtime = bridge.runtime();

    let handle = match runtime.connect(object, signal, closure, after) {
        Ok(handle) => handle,
        Err(e) => {
            abandon(owner, closure);
            return Err(e.into());
        }
    };

    // The closure may be finalized (and its identity reused) once the
    // runtime holds it; only a closure still holding this callback is recorded
    let mut recorded =
        owner.closures.holds(closure, &callback) && owner.signals.associate(handle, closure);
    if recorded && !owner.closures.holds(closure, &callback) {
        owner.signals.dissociate(handle);
        recorded = false;
    }
    if !recorded {
        debug!("{} finalized before {} was recorded", closure, handle);
    }

    bridge.stats_handle().inc_connects();
    debug!(
        "Connected {} to {}::{} as {} (after: {})",
        closure, object, signal, handle, after
    );
    Ok(handle)
}

/// Register a floating closure with trampolines installed
pub(crate) fn closure_new(
    owner: &Arc<ObjectBox>,
    value: Value,
    site: CallSite,
) -> BridgeResult<ClosureId> {
    let callback = Arc::new(Callback::from_value(value, site, FLOATING_LABEL)?);
    let closure = prepare(owner, &callback)?;
    debug!("Created floating {} on {}", closure, owner.object().id());
    Ok(closure)
}

/// Disconnect a handler recorded on this object
pub(crate) fn disconnect(owner: &ObjectBox, handle: SignalHandle) -> BridgeResult<()> {
    let Some(closure) = owner.signals.dissociate(handle) else {
        debug!("Disconnect of unknown {} ignored", handle);
        return Ok(());
    };

    // Forget the entry while the identity still belongs to this handler
    owner.closures.delete(closure);
    let bridge = owner.bridge();
    let result = bridge.runtime().disconnect(owner.object().id(), handle);
    bridge.stats_handle().inc_disconnects();

    result.map_err(BridgeError::from)
}

/// Connect-time receiver and parameter count checks
fn validate(owner: &ObjectBox, callback: &Callback, signal: &str) -> BridgeResult<()> {
    let object = owner.object();
    callback.check_receiver(object.object_type())?;

    if let Some(spec) = owner.bridge().runtime().query_signal(object.id(), signal) {
        callback.check_arity(signal, spec.supplied_args())?;
    }
    Ok(())
}

/// Create the native closure, register the callback and install trampolines
fn prepare(owner: &Arc<ObjectBox>, callback: &Arc<Callback>) -> BridgeResult<ClosureId> {
    let bridge = owner.bridge();
    let runtime = bridge.runtime();
    let closure = runtime.create_closure()?;

    if let Err(e) = owner.closures.register(closure, Arc::clone(callback)) {
        release(owner, closure);
        return Err(e);
    }

    let weak = Arc::downgrade(owner);
    let stats = bridge.stats_handle();
    let installed = runtime
        .set_meta_marshal(
            closure,
            trampoline::marshal(weak.clone(), Arc::clone(stats)),
        )
        .and_then(|()| {
            runtime.add_finalize_notifier(closure, trampoline::finalize(weak, Arc::clone(stats)))
        });

    if let Err(e) = installed {
        abandon(owner, closure);
        return Err(e.into());
    }
    Ok(closure)
}

/// Undo a registration whose native side never got connected
fn abandon(owner: &ObjectBox, closure: ClosureId) {
    owner.closures.delete(closure);
    release(owner, closure);
}

fn release(owner: &ObjectBox, closure: ClosureId) {
    if let Err(e) = owner.bridge().runtime().release_closure(closure) {
        warn!("Failed to release {}: {}", closure, e);
    }
}
