/*!
 * Monitoring
 * Structured tracing for the emission path
 */

mod tracer;

pub use tracer::{emission_span, init_tracing};
