/*!
 * Native Values
 * Tagged values as the native runtime passes them to closures
 */

use super::object::ObjectRef;
use crate::core::types::Name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a native value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    None,
    Boolean,
    Int,
    UInt,
    Double,
    String,
    Pointer,
    Object,
}

impl NativeType {
    pub fn name(&self) -> &'static str {
        match self {
            NativeType::None => "none",
            NativeType::Boolean => "gboolean",
            NativeType::Int => "gint64",
            NativeType::UInt => "guint64",
            NativeType::Double => "gdouble",
            NativeType::String => "gchararray",
            NativeType::Pointer => "gpointer",
            NativeType::Object => "GObject",
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value crossing from the native runtime into a closure invocation
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    None,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Pointer(usize),
    Object(ObjectRef),
}

impl NativeValue {
    pub fn native_type(&self) -> NativeType {
        match self {
            NativeValue::None => NativeType::None,
            NativeValue::Boolean(_) => NativeType::Boolean,
            NativeValue::Int(_) => NativeType::Int,
            NativeValue::UInt(_) => NativeType::UInt,
            NativeValue::Double(_) => NativeType::Double,
            NativeValue::String(_) => NativeType::String,
            NativeValue::Pointer(_) => NativeType::Pointer,
            NativeValue::Object(_) => NativeType::Object,
        }
    }

    /// Type name for diagnostics; objects report their concrete type
    pub fn type_name(&self) -> Name {
        match self {
            NativeValue::Object(obj) => obj.type_name().clone(),
            other => other.native_type().name().into(),
        }
    }

    /// Whether this value may be passed where `ty` is declared
    pub fn conforms_to(&self, ty: NativeType) -> bool {
        self.native_type() == ty || matches!(self, NativeValue::None) && ty == NativeType::Object
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Boolean(v)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        NativeValue::Int(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        NativeValue::Int(v as i64)
    }
}

impl From<u64> for NativeValue {
    fn from(v: u64) -> Self {
        NativeValue::UInt(v)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        NativeValue::Double(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::String(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::String(v)
    }
}

impl From<ObjectRef> for NativeValue {
    fn from(v: ObjectRef) -> Self {
        NativeValue::Object(v)
    }
}

/// Slot an emission hands to the marshal for the signal's return value
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSlot {
    ty: NativeType,
    value: Option<NativeValue>,
}

impl ReturnSlot {
    pub fn new(ty: NativeType) -> Self {
        Self { ty, value: None }
    }

    /// Declared type of the return value
    pub fn ty(&self) -> NativeType {
        self.ty
    }

    pub fn value(&self) -> Option<&NativeValue> {
        self.value.as_ref()
    }

    /// Store a value; values not conforming to the slot type are refused
    pub fn set(&mut self, value: NativeValue) -> bool {
        if !value.conforms_to(self.ty) {
            return false;
        }
        self.value = Some(value);
        true
    }

    pub fn take(&mut self) -> Option<NativeValue> {
        self.value.take()
    }
}
