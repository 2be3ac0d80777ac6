/*!
 * Tracing
 * Subscriber setup and the span wrapped around every callback emission
 *
 * Environment variables:
 * - RUST_LOG: log level filter (default: info)
 * - BRIDGE_TRACE_JSON: JSON output when "1" or "true"
 */

use crate::core::limits::ENV_TRACE_JSON;
use crate::core::types::{ClosureId, ObjectId};
use tracing::{info, span, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Install the global subscriber
///
/// `log` records are forwarded through the `tracing-log` bridge. Returns
/// false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Tracing initialized");
    }
    installed
}

/// Span covering one marshal invocation
pub fn emission_span(object: ObjectId, closure: ClosureId, signal: &str) -> Span {
    span!(
        Level::DEBUG,
        "emission",
        object = object.as_raw(),
        closure = %closure,
        signal = signal,
    )
}
