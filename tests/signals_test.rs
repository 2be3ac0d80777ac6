/*!
 * Signal Bridge Tests
 * Connect, emit, disconnect and finalize through a local runtime
 */

use closure_bridge::native::{FinalizeFn, MarshalFn};
use closure_bridge::*;
use flume::Receiver;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn button_type() -> Arc<ObjectType> {
    let widget = ObjectType::new("Widget").signal(SignalSpec::new("destroy"));
    ObjectType::subclass("Button", &widget)
        .signal(SignalSpec::new("clicked"))
        .signal(
            SignalSpec::new("pressed")
                .param(NativeType::Int)
                .param(NativeType::Int),
        )
        .signal(
            SignalSpec::new("toggled")
                .param(NativeType::Boolean)
                .returns(NativeType::Boolean),
        )
        .signal(SignalSpec::new("notify").param(NativeType::String))
        .build()
}

struct Fixture {
    runtime: Arc<LocalRuntime>,
    bridge: Bridge,
    failures: Receiver<CallbackFailure>,
    native: ObjectRef,
    object: Object,
}

impl Fixture {
    fn new(config: BridgeConfig) -> Self {
        let runtime = Arc::new(LocalRuntime::new());
        let (reporter, failures) = ChannelReporter::new(64);
        let bridge = Bridge::builder(runtime.clone())
            .with_reporter(Arc::new(reporter))
            .with_config(config)
            .build();
        let native = runtime.new_object(button_type());
        let object = bridge.wrap(native.clone());
        Self {
            runtime,
            bridge,
            failures,
            native,
            object,
        }
    }

    fn emit(&self, signal: &str, args: &[NativeValue]) -> Option<NativeValue> {
        self.runtime.emit(self.native.id(), signal, args).unwrap()
    }

    fn failures(&self) -> Vec<CallbackFailure> {
        self.failures.try_iter().collect()
    }
}

fn counting(params: Vec<ValueType>) -> (Function, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let func = Function::new("count", params, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Nil)
    });
    (func, calls)
}

#[test]
fn test_connect_disconnect_cycle() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, calls) = counting(vec![ValueType::object("Button")]);

    let handle = fx.object.connect("clicked", func).unwrap();
    let closure = fx.object.closure_for(handle).unwrap();
    assert!(fx.object.is_registered(closure));

    fx.emit("clicked", &[]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    fx.object.disconnect(handle).unwrap();
    fx.emit("clicked", &[]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(!fx.object.is_registered(closure));
    assert_eq!(fx.object.handler_count(), 0);
    assert_eq!(fx.runtime.live_closures(), 0);
    assert!(fx.failures().is_empty());
}

#[test]
fn test_disconnect_is_idempotent() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, _) = counting(vec![]);

    let handle = fx.object.connect("clicked", func).unwrap();
    fx.object.disconnect(handle).unwrap();
    fx.object.disconnect(handle).unwrap();
    fx.object.disconnect(SignalHandle::from_raw(9999)).unwrap();

    let stats = fx.bridge.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.disconnects, 1);
}

#[test]
fn test_native_disconnect_finalizes_registry_entry() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, _) = counting(vec![]);

    let handle = fx.object.connect("clicked", func).unwrap();
    let closure = fx.object.closure_for(handle).unwrap();

    // Bypass the bridge: only the finalize trampoline can clean up
    fx.runtime.disconnect(fx.native.id(), handle).unwrap();

    assert!(!fx.object.is_registered(closure));
    assert_eq!(fx.object.closure_for(handle), None);
    assert_eq!(fx.object.handler_count(), 0);
    assert_eq!(fx.bridge.stats().finalized, 1);

    // Bridge disconnect after the fact is a no-op
    fx.object.disconnect(handle).unwrap();
}

#[test]
fn test_destroyed_native_object_finalizes_all_closures() {
    let fx = Fixture::new(BridgeConfig::default());
    for signal in ["clicked", "pressed", "toggled"] {
        let (func, _) = counting(vec![]);
        fx.object.connect(signal, func).unwrap();
    }
    assert_eq!(fx.object.closure_count(), 3);

    assert_eq!(fx.runtime.destroy_object(fx.native.id()).unwrap(), 3);
    assert_eq!(fx.object.closure_count(), 0);
    assert_eq!(fx.object.handler_count(), 0);
    assert_eq!(fx.runtime.live_closures(), 0);
}

#[test]
fn test_relaxed_arity_truncates_extra_arguments() {
    let fx = Fixture::new(BridgeConfig::default());
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    fx.object
        .connect(
            "pressed",
            Function::new("first_only", [ValueType::Any], move |args| {
                sink.lock().unwrap().extend_from_slice(args);
                Ok(Value::Nil)
            }),
        )
        .unwrap();

    fx.emit("pressed", &[NativeValue::Int(3), NativeValue::Int(4)]);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], Value::Object(fx.native.clone()));
    assert!(fx.failures().is_empty());
}

#[test]
fn test_missing_arguments_are_reported_not_fatal() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, calls) = counting(vec![ValueType::Any, ValueType::Int, ValueType::Int]);
    fx.object.connect("clicked", func).unwrap();

    fx.emit("clicked", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let failures = fx.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].error,
        BridgeError::ArityMismatch {
            declared: 3,
            supplied: 1
        }
    );
    assert_eq!(failures[0].signal.as_str(), "clicked");
    assert_eq!(failures[0].object, fx.native.id());
}

#[test]
fn test_exact_arity_rejects_extra_arguments() {
    let fx = Fixture::new(BridgeConfig::default().with_arity(ArityPolicy::Exact));
    let (func, calls) = counting(vec![ValueType::Any]);
    fx.object.connect("pressed", func).unwrap();

    fx.emit("pressed", &[NativeValue::Int(1), NativeValue::Int(2)]);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let failures = fx.failures();
    assert_eq!(
        failures[0].error,
        BridgeError::ArityMismatch {
            declared: 1,
            supplied: 3
        }
    );
    assert_eq!(fx.bridge.stats().failures, 1);
}

#[test]
fn test_strict_receiver_check_leaves_nothing_behind() {
    let fx = Fixture::new(BridgeConfig::default().with_receiver_check(true));

    let (wrong, _) = counting(vec![ValueType::Int]);
    let err = fx.object.connect("clicked", wrong).unwrap_err();
    assert!(matches!(err, BridgeError::ReceiverMismatch { .. }));
    assert!(err.is_configuration());

    let (none, _) = counting(vec![]);
    let err = fx.object.connect("clicked", none).unwrap_err();
    assert!(matches!(err, BridgeError::MissingReceiver { .. }));

    let (unrelated, _) = counting(vec![ValueType::object("Window")]);
    assert!(fx.object.connect("clicked", unrelated).is_err());

    assert_eq!(fx.object.closure_count(), 0);
    assert_eq!(fx.runtime.live_closures(), 0);
    assert_eq!(fx.bridge.stats().connects, 0);
}

#[test]
fn test_strict_check_accepts_ancestor_receiver() {
    let fx = Fixture::new(BridgeConfig::strict());
    let (func, calls) = counting(vec![ValueType::object("Widget"), ValueType::Int]);
    fx.object.connect("pressed", func).unwrap();

    fx.emit("pressed", &[NativeValue::Int(1), NativeValue::Int(2)]);
    // Exact arity: two parameters against three supplied values
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let fx = Fixture::new(BridgeConfig::default().with_receiver_check(true));
    let (func, calls) = counting(vec![ValueType::object("Widget"), ValueType::Int]);
    fx.object.connect("pressed", func).unwrap();
    fx.emit("pressed", &[NativeValue::Int(1), NativeValue::Int(2)]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_strict_check_rejects_too_many_parameters() {
    let fx = Fixture::new(BridgeConfig::default().with_receiver_check(true));
    let (func, _) = counting(vec![
        ValueType::object("Button"),
        ValueType::Int,
        ValueType::Int,
        ValueType::Int,
    ]);

    let err = fx.object.connect("pressed", func).unwrap_err();
    match err {
        BridgeError::TooManyParameters {
            signal,
            declared,
            supplied,
            ..
        } => {
            assert_eq!(signal.as_str(), "pressed");
            assert_eq!(declared, 4);
            assert_eq!(supplied, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.runtime.live_closures(), 0);
}

#[test]
fn test_receiver_error_names_connect_site() {
    let fx = Fixture::new(BridgeConfig::default().with_receiver_check(true));
    let (func, _) = counting(vec![]);
    let line = line!() + 1;
    let err = fx.object.connect("clicked", func).unwrap_err();

    match err {
        BridgeError::MissingReceiver { site } => {
            assert!(site.file.ends_with("signals_test.rs"));
            assert_eq!(site.line, line);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_panicking_callback_does_not_stop_emission() {
    let fx = Fixture::new(BridgeConfig::default());
    fx.object
        .connect(
            "clicked",
            Function::new("explode", [], |_| panic!("boom")),
        )
        .unwrap();
    let (func, calls) = counting(vec![]);
    fx.object.connect("clicked", func).unwrap();

    fx.emit("clicked", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let failures = fx.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error, BridgeError::CallbackPanicked("boom".into()));

    // The closure stays connected and keeps being invoked
    fx.emit("clicked", &[]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.failures().len(), 1);
}

#[test]
fn test_host_error_is_reported_with_context() {
    let fx = Fixture::new(BridgeConfig::default());
    fx.object
        .connect(
            "clicked",
            Function::new("refuse", [], |_| Err(HostError::new("nope"))),
        )
        .unwrap();

    fx.emit("clicked", &[]);

    let failures = fx.failures();
    assert_eq!(failures[0].error, BridgeError::Host("nope".into()));
    assert!(failures[0].site.file.ends_with("signals_test.rs"));
    assert!(failures[0].to_string().contains("clicked callback on"));
}

#[test]
fn test_return_value_reaches_native_slot() {
    let fx = Fixture::new(BridgeConfig::default());
    fx.object
        .connect(
            "toggled",
            Function::new(
                "invert",
                [ValueType::object("Button"), ValueType::Bool],
                |args| Ok(Value::Bool(!args[1].as_bool().unwrap_or(false))),
            ),
        )
        .unwrap();

    assert_eq!(
        fx.emit("toggled", &[NativeValue::Boolean(true)]),
        Some(NativeValue::Boolean(false))
    );
}

#[test]
fn test_unconvertible_return_value_is_reported() {
    let fx = Fixture::new(BridgeConfig::default());
    fx.object
        .connect(
            "toggled",
            Function::new("wrong", [], |_| Ok(Value::Str("yes".into()))),
        )
        .unwrap();

    assert_eq!(fx.emit("toggled", &[NativeValue::Boolean(true)]), None);
    assert_eq!(
        fx.failures()[0].error,
        BridgeError::Conversion {
            position: "return value".into(),
            expected: "gboolean".into(),
            found: "string".into(),
        }
    );
}

#[test]
fn test_unknown_signal_leaves_nothing_registered() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, _) = counting(vec![]);

    let err = fx.object.connect("missing", func).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Native(NativeError::UnknownSignal { .. })
    ));
    assert_eq!(fx.object.closure_count(), 0);
    assert_eq!(fx.object.handler_count(), 0);
    assert_eq!(fx.runtime.live_closures(), 0);
}

#[test]
fn test_non_callable_is_rejected() {
    let fx = Fixture::new(BridgeConfig::default());
    let err = fx.object.connect("clicked", Value::Int(3)).unwrap_err();
    assert_eq!(err, BridgeError::NotCallable { found: "int".into() });
    assert_eq!(fx.runtime.live_closures(), 0);
}

#[test]
fn test_empty_signal_name_is_rejected() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, _) = counting(vec![]);
    let err = fx.object.connect("", func).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidCallback { .. }));
    assert_eq!(fx.runtime.live_closures(), 0);
}

#[test]
fn test_dropping_wrapper_disconnects_handlers() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, calls) = counting(vec![]);
    fx.object.connect("clicked", func.clone()).unwrap();
    fx.object.connect_after("clicked", func).unwrap();
    assert_eq!(fx.runtime.handler_count(fx.native.id()), 2);

    let Fixture {
        runtime,
        bridge,
        native,
        object,
        ..
    } = fx;
    drop(object);

    assert_eq!(runtime.handler_count(native.id()), 0);
    assert_eq!(runtime.live_closures(), 0);
    assert_eq!(bridge.object_count(), 0);

    runtime.emit(native.id(), "clicked", &[]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_wrap_returns_live_wrapper() {
    let fx = Fixture::new(BridgeConfig::default());
    let again = fx.bridge.wrap(fx.native.clone());
    assert!(again.ptr_eq(&fx.object));
    assert_eq!(fx.bridge.object_count(), 1);
}

#[test]
fn test_before_handlers_run_before_after_handlers() {
    let fx = Fixture::new(BridgeConfig::default());
    let order = Arc::new(Mutex::new(Vec::new()));

    for (name, after) in [("late", true), ("early", false)] {
        let log = Arc::clone(&order);
        let func = Function::new(name, [], move |_| {
            log.lock().unwrap().push(name);
            Ok(Value::Nil)
        });
        if after {
            fx.object.connect_after("clicked", func).unwrap();
        } else {
            fx.object.connect("clicked", func).unwrap();
        }
    }

    fx.emit("clicked", &[]);
    assert_eq!(*order.lock().unwrap(), vec!["early", "late"]);
}

#[test]
fn test_detailed_signal_only_sees_its_detail() {
    let fx = Fixture::new(BridgeConfig::default());
    let (label, label_calls) = counting(vec![]);
    let (any, any_calls) = counting(vec![]);
    fx.object.connect("notify::label", label).unwrap();
    fx.object.connect("notify", any).unwrap();

    fx.emit("notify::label", &[NativeValue::from("label")]);
    fx.emit("notify::width", &[NativeValue::from("width")]);

    assert_eq!(label_calls.load(Ordering::SeqCst), 1);
    assert_eq!(any_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_callback_can_disconnect_itself() {
    let fx = Fixture::new(BridgeConfig::default());
    let handle_slot: Arc<Mutex<Option<SignalHandle>>> = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let object = fx.object.clone();
    let slot = Arc::clone(&handle_slot);
    let seen = Arc::clone(&calls);
    let handle = fx
        .object
        .connect(
            "clicked",
            Function::new("once", [], move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                if let Some(handle) = slot.lock().unwrap().take() {
                    object.disconnect(handle).map_err(|e| HostError::new(e.to_string()))?;
                }
                Ok(Value::Nil)
            }),
        )
        .unwrap();
    *handle_slot.lock().unwrap() = Some(handle);

    fx.emit("clicked", &[]);
    fx.emit("clicked", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.object.closure_count(), 0);
    assert_eq!(fx.runtime.live_closures(), 0);
    assert!(fx.failures().is_empty());
}

#[test]
fn test_floating_closure_is_finalized_on_release() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, _) = counting(vec![]);

    let closure = fx.object.closure_new(func).unwrap();
    assert!(fx.object.is_registered(closure));
    assert_eq!(fx.object.handler_count(), 0);
    assert_eq!(fx.runtime.ref_count(closure), Some(1));

    fx.runtime.release_closure(closure).unwrap();
    assert!(!fx.object.is_registered(closure));
    assert!(!fx.runtime.is_live(closure));
}

#[test]
fn test_recycled_identity_gets_fresh_callback() {
    let fx = Fixture::new(BridgeConfig::default());
    let (first, first_calls) = counting(vec![]);
    let (second, second_calls) = counting(vec![]);

    let handle = fx.object.connect("clicked", first).unwrap();
    let closure = fx.object.closure_for(handle).unwrap();
    fx.object.disconnect(handle).unwrap();

    let handle = fx.object.connect("clicked", second).unwrap();
    assert_eq!(fx.object.closure_for(handle), Some(closure));

    fx.emit("clicked", &[]);
    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stats_track_lifecycle() {
    let fx = Fixture::new(BridgeConfig::default());
    let (func, _) = counting(vec![]);

    let handle = fx.object.connect("clicked", func).unwrap();
    fx.emit("clicked", &[]);
    fx.emit("clicked", &[]);
    fx.object.disconnect(handle).unwrap();

    let stats = fx.bridge.stats();
    assert_eq!(
        stats,
        StatsSnapshot {
            connects: 1,
            disconnects: 1,
            emissions: 2,
            skipped_emissions: 0,
            failures: 0,
            finalized: 1,
        }
    );
}

// ============================================================================
// Identity reuse while a connect or disconnect is in flight
// ============================================================================

type Hook = Box<dyn FnOnce(&LocalRuntime, ObjectId, SignalHandle) + Send>;

/// Local runtime that runs a one-shot hook right after a native connect or
/// disconnect, standing in for another thread acting at that moment
struct HookedRuntime {
    inner: Arc<LocalRuntime>,
    after_connect: Mutex<Option<Hook>>,
    after_disconnect: Mutex<Option<Hook>>,
}

impl HookedRuntime {
    fn new(inner: Arc<LocalRuntime>) -> Self {
        Self {
            inner,
            after_connect: Mutex::new(None),
            after_disconnect: Mutex::new(None),
        }
    }
}

impl NativeRuntime for HookedRuntime {
    fn create_closure(&self) -> NativeResult<ClosureId> {
        self.inner.create_closure()
    }

    fn set_meta_marshal(&self, closure: ClosureId, marshal: MarshalFn) -> NativeResult<()> {
        self.inner.set_meta_marshal(closure, marshal)
    }

    fn add_finalize_notifier(&self, closure: ClosureId, notify: FinalizeFn) -> NativeResult<()> {
        self.inner.add_finalize_notifier(closure, notify)
    }

    fn release_closure(&self, closure: ClosureId) -> NativeResult<()> {
        self.inner.release_closure(closure)
    }

    fn connect(
        &self,
        object: ObjectId,
        signal: &str,
        closure: ClosureId,
        after: bool,
    ) -> NativeResult<SignalHandle> {
        let handle = self.inner.connect(object, signal, closure, after)?;
        let hook = self.after_connect.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner, object, handle);
        }
        Ok(handle)
    }

    fn disconnect(&self, object: ObjectId, handle: SignalHandle) -> NativeResult<()> {
        self.inner.disconnect(object, handle)?;
        let hook = self.after_disconnect.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner, object, handle);
        }
        Ok(())
    }

    fn query_signal(&self, object: ObjectId, signal: &str) -> Option<SignalSpec> {
        self.inner.query_signal(object, signal)
    }
}

fn hooked() -> (Arc<LocalRuntime>, Arc<HookedRuntime>, ObjectRef, Object) {
    let local = Arc::new(LocalRuntime::new());
    let hooked = Arc::new(HookedRuntime::new(local.clone()));
    let bridge = Bridge::new(hooked.clone());
    let native = local.new_object(button_type());
    let object = bridge.wrap(native.clone());
    (local, hooked, native, object)
}

#[test]
fn test_disconnect_keeps_entry_of_connection_reusing_identity() {
    let (local, hooked, native, object) = hooked();
    let (first, first_calls) = counting(vec![]);
    let (second, second_calls) = counting(vec![]);

    let first_handle = object.connect("clicked", first).unwrap();
    let closure = object.closure_for(first_handle).unwrap();

    let second_handle = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&second_handle);
    let other = object.clone();
    *hooked.after_disconnect.lock().unwrap() = Some(Box::new(
        move |_: &LocalRuntime, _: ObjectId, _: SignalHandle| {
            *slot.lock().unwrap() = Some(other.connect("clicked", second).unwrap());
        },
    ));

    object.disconnect(first_handle).unwrap();

    let second_handle = second_handle.lock().unwrap().take().unwrap();
    assert_eq!(object.closure_for(second_handle), Some(closure));
    assert!(object.is_registered(closure));

    local.emit(native.id(), "clicked", &[]).unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);

    object.disconnect(second_handle).unwrap();
    assert_eq!(local.handler_count(native.id()), 0);
    assert_eq!(object.closure_count(), 0);
}

#[test]
fn test_connect_finalized_mid_flight_leaves_reusing_connection_intact() {
    let (local, hooked, native, object) = hooked();
    let (first, first_calls) = counting(vec![]);
    let (second, second_calls) = counting(vec![]);

    let second_handle = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&second_handle);
    let other = object.clone();
    *hooked.after_connect.lock().unwrap() = Some(Box::new(
        move |runtime: &LocalRuntime, object_id: ObjectId, handle: SignalHandle| {
            // Finalize the fresh closure, then let its identity be reused
            runtime.disconnect(object_id, handle).unwrap();
            *slot.lock().unwrap() = Some(other.connect("clicked", second).unwrap());
        },
    ));

    let first_handle = object.connect("clicked", first).unwrap();
    let second_handle = second_handle.lock().unwrap().take().unwrap();

    assert_eq!(object.closure_for(first_handle), None);
    let closure = object.closure_for(second_handle).unwrap();
    assert!(object.is_registered(closure));
    assert_eq!(object.handler_count(), 1);

    local.emit(native.id(), "clicked", &[]).unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);

    object.disconnect(second_handle).unwrap();
    assert_eq!(local.handler_count(native.id()), 0);
    assert_eq!(local.live_closures(), 0);
    assert_eq!(object.closure_count(), 0);
}
