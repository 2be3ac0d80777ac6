/*!
 * Native Runtime
 * Value model, object model and closure interface of the reference-counted runtime
 */

mod local;
mod object;
pub mod traits;
mod value;

// Re-export public API
pub use local::LocalRuntime;
pub use object::{base_signal_name, ObjectRef, ObjectType, SignalSpec, DETAIL_SEPARATOR};
pub use traits::{finalize_fn, marshal_fn, FinalizeFn, MarshalFn, NativeRuntime};
pub use value::{NativeType, NativeValue, ReturnSlot};
