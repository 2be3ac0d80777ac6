/*!
 * Host Values
 * Dynamic values and parameter types on the host side of the bridge
 */

use super::function::Function;
use crate::core::types::Name;
use crate::native::{ObjectRef, ObjectType};
use std::fmt;

/// Declared type of a host function parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    UInt,
    Float,
    Str,
    Pointer,
    /// Object of the named type or any subtype
    Object(Name),
    /// Accepts any value in its natural host form
    Any,
}

impl ValueType {
    pub fn object(type_name: &str) -> Self {
        ValueType::Object(type_name.into())
    }

    /// Whether an instance of `ty` can be passed for this parameter
    pub fn accepts_instance_of(&self, ty: &ObjectType) -> bool {
        match self {
            ValueType::Object(name) => ty.is_a(name),
            ValueType::Any => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::UInt => f.write_str("uint"),
            ValueType::Float => f.write_str("float"),
            ValueType::Str => f.write_str("string"),
            ValueType::Pointer => f.write_str("pointer"),
            ValueType::Object(name) => write!(f, "*{}", name),
            ValueType::Any => f.write_str("any"),
        }
    }
}

/// A host value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Pointer(usize),
    Object(ObjectRef),
    Function(Function),
}

impl Value {
    /// Type name for diagnostics
    pub fn type_name(&self) -> Name {
        match self {
            Value::Nil => "nil".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::UInt(_) => "uint".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "string".into(),
            Value::Pointer(_) => "pointer".into(),
            Value::Object(obj) => obj.type_name().clone(),
            Value::Function(_) => "func".into(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Value::Function(v)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}
