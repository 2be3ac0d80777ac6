/*!
 * Closure Bookkeeping
 * Callable wrappers, the per-object registry and handler associations
 */

mod association;
mod callback;
mod registry;

pub use association::SignalTable;
pub use callback::Callback;
pub use registry::ClosureRegistry;
