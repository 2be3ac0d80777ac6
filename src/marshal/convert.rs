/*!
 * Argument Conversion
 * Native ↔ host value conversion used at emission time
 */

use crate::host::{Value, ValueType};
use crate::native::{NativeType, NativeValue};

/// Conversion table between native and host values
///
/// `None` means the value is not convertible to the requested type; the
/// caller turns that into an error naming the argument position.
pub trait ArgConverter: Send + Sync {
    /// Convert an emission argument to a callback parameter type
    fn to_host(&self, value: &NativeValue, want: &ValueType) -> Option<Value>;

    /// Convert a callback's return value to the signal's return type
    fn to_native(&self, value: &Value, want: NativeType) -> Option<NativeValue>;
}

/// Scalars, strings, pointers and objects
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConverter;

impl StandardConverter {
    /// Natural host form of a native value
    fn natural(value: &NativeValue) -> Value {
        match value {
            NativeValue::None => Value::Nil,
            NativeValue::Boolean(v) => Value::Bool(*v),
            NativeValue::Int(v) => Value::Int(*v),
            NativeValue::UInt(v) => Value::UInt(*v),
            NativeValue::Double(v) => Value::Float(*v),
            NativeValue::String(v) => Value::Str(v.clone()),
            NativeValue::Pointer(v) => Value::Pointer(*v),
            NativeValue::Object(v) => Value::Object(v.clone()),
        }
    }
}

impl ArgConverter for StandardConverter {
    fn to_host(&self, value: &NativeValue, want: &ValueType) -> Option<Value> {
        match (want, value) {
            (ValueType::Any, v) => Some(Self::natural(v)),
            (ValueType::Bool, NativeValue::Boolean(v)) => Some(Value::Bool(*v)),
            (ValueType::Int, NativeValue::Int(v)) => Some(Value::Int(*v)),
            (ValueType::Int, NativeValue::UInt(v)) => i64::try_from(*v).ok().map(Value::Int),
            (ValueType::UInt, NativeValue::UInt(v)) => Some(Value::UInt(*v)),
            (ValueType::UInt, NativeValue::Int(v)) => u64::try_from(*v).ok().map(Value::UInt),
            (ValueType::Float, NativeValue::Double(v)) => Some(Value::Float(*v)),
            (ValueType::Float, NativeValue::Int(v)) => Some(Value::Float(*v as f64)),
            (ValueType::Float, NativeValue::UInt(v)) => Some(Value::Float(*v as f64)),
            (ValueType::Str, NativeValue::String(v)) => Some(Value::Str(v.clone())),
            (ValueType::Pointer, NativeValue::Pointer(v)) => Some(Value::Pointer(*v)),
            (ValueType::Object(_), NativeValue::None) => Some(Value::Nil),
            (ValueType::Object(name), NativeValue::Object(obj)) if obj.is_a(name) => {
                Some(Value::Object(obj.clone()))
            }
            _ => None,
        }
    }

    fn to_native(&self, value: &Value, want: NativeType) -> Option<NativeValue> {
        match (want, value) {
            (NativeType::Boolean, Value::Bool(v)) => Some(NativeValue::Boolean(*v)),
            (NativeType::Int, Value::Int(v)) => Some(NativeValue::Int(*v)),
            (NativeType::Int, Value::UInt(v)) => i64::try_from(*v).ok().map(NativeValue::Int),
            (NativeType::UInt, Value::UInt(v)) => Some(NativeValue::UInt(*v)),
            (NativeType::UInt, Value::Int(v)) => u64::try_from(*v).ok().map(NativeValue::UInt),
            (NativeType::Double, Value::Float(v)) => Some(NativeValue::Double(*v)),
            (NativeType::Double, Value::Int(v)) => Some(NativeValue::Double(*v as f64)),
            (NativeType::String, Value::Str(v)) => Some(NativeValue::String(v.clone())),
            (NativeType::Pointer, Value::Pointer(v)) => Some(NativeValue::Pointer(*v)),
            (NativeType::Object, Value::Object(v)) => Some(NativeValue::Object(v.clone())),
            (NativeType::Object, Value::Nil) => Some(NativeValue::None),
            _ => None,
        }
    }
}
