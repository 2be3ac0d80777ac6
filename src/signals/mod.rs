/*!
 * Signal Bridge
 * Connecting host callbacks to native signals through bridge closures
 */

mod atomic_stats;
mod bridge;
mod connector;
mod object;
mod report;
mod trampoline;

pub use atomic_stats::{BridgeStats, StatsSnapshot};
pub use bridge::{Bridge, BridgeBuilder};
pub use object::Object;
pub use report::{CallbackFailure, ChannelReporter, FailureReporter, LogReporter};
