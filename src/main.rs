/*!
 * Closure Bridge - Demo Entry Point
 *
 * Wires a local runtime to the bridge and walks a handler through its life:
 * - connect before and after the default stage
 * - emit with and without a return value
 * - disconnect and observe finalization
 */

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use closure_bridge::{
    init_tracing, Bridge, BridgeConfig, Function, LocalRuntime, NativeType, NativeValue,
    ObjectType, SignalSpec, Value, ValueType,
};

fn main() -> Result<()> {
    init_tracing();

    info!("Closure bridge demo starting...");

    let widget = ObjectType::new("Widget").signal(SignalSpec::new("destroy"));
    let button_type = ObjectType::subclass("Button", &widget)
        .signal(SignalSpec::new("clicked"))
        .signal(
            SignalSpec::new("toggled")
                .param(NativeType::Boolean)
                .returns(NativeType::Boolean),
        )
        .build();

    let runtime = Arc::new(LocalRuntime::new());
    let bridge = Bridge::builder(runtime.clone())
        .with_config(BridgeConfig::from_env().with_receiver_check(true))
        .build();

    let native = runtime.new_object(button_type);
    let button = bridge.wrap(native.clone());

    let clicked = button
        .connect(
            "clicked",
            Function::new("on_clicked", [ValueType::object("Widget")], |args| {
                info!("clicked: {:?}", args[0].as_object().map(|o| o.to_string()));
                Ok(Value::Nil)
            }),
        )
        .context("connecting clicked")?;

    button
        .connect_after(
            "clicked",
            Function::new("after_clicked", [ValueType::Any], |_| {
                info!("clicked (after default stage)");
                Ok(Value::Nil)
            }),
        )
        .context("connecting clicked after")?;

    let state = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&state);
    button
        .connect(
            "toggled",
            Function::new(
                "on_toggled",
                [ValueType::object("Button"), ValueType::Bool],
                move |args| {
                    let active = args[1].as_bool().unwrap_or(false);
                    seen.store(active, Ordering::SeqCst);
                    Ok(Value::Bool(!active))
                },
            ),
        )
        .context("connecting toggled")?;

    runtime.emit(native.id(), "clicked", &[])?;
    let reply = runtime.emit(native.id(), "toggled", &[NativeValue::Boolean(true)])?;
    info!(
        "toggled returned {:?}, handler saw {}",
        reply,
        state.load(Ordering::SeqCst)
    );

    button.disconnect(clicked)?;
    runtime.emit(native.id(), "clicked", &[])?;
    info!(
        "After disconnect: {} handlers, {} registered closures, {} live native closures",
        button.handler_count(),
        button.closure_count(),
        runtime.live_closures()
    );

    drop(button);
    info!(
        "After dropping the wrapper: {} live native closures",
        runtime.live_closures()
    );

    let stats = bridge.stats();
    info!(
        connects = stats.connects,
        disconnects = stats.disconnects,
        emissions = stats.emissions,
        failures = stats.failures,
        finalized = stats.finalized,
        "Bridge statistics"
    );

    Ok(())
}
