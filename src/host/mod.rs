/*!
 * Host Language Model
 * Dynamic values and callables as seen by application code
 */

mod function;
mod value;

pub use function::{Function, HostError, HostResult};
pub use value::{Value, ValueType};
