/*!
 * Closure Bridge Library
 * Host callbacks as native signal handlers, with identity-keyed closure bookkeeping
 */

pub mod closure;
pub mod core;
pub mod host;
pub mod marshal;
pub mod monitoring;
pub mod native;
pub mod signals;

// Re-exports
pub use crate::core::{
    ArityPolicy, BridgeConfig, BridgeError, BridgeResult, CallSite, ClosureId, NativeError,
    NativeResult, ObjectId, SignalHandle,
};
pub use closure::{Callback, ClosureRegistry, SignalTable};
pub use host::{Function, HostError, HostResult, Value, ValueType};
pub use marshal::{ArgConverter, StandardConverter};
pub use monitoring::init_tracing;
pub use native::{
    LocalRuntime, NativeRuntime, NativeType, NativeValue, ObjectRef, ObjectType, ReturnSlot,
    SignalSpec,
};
pub use signals::{
    Bridge, BridgeBuilder, CallbackFailure, ChannelReporter, FailureReporter, LogReporter, Object,
    StatsSnapshot,
};
