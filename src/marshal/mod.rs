/*!
 * Marshaling
 * Conversion tables between native emission values and host parameters
 */

mod convert;

pub use convert::{ArgConverter, StandardConverter};
