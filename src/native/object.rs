/*!
 * Native Object Model
 * Type descriptors, signal declarations and object references
 */

use super::value::NativeType;
use crate::core::types::{Name, ObjectId};
use std::fmt;
use std::sync::Arc;

/// Separator between a signal name and its detail ("notify::label")
pub const DETAIL_SEPARATOR: &str = "::";

/// Signal name without its detail
pub fn base_signal_name(detailed: &str) -> &str {
    detailed
        .split_once(DETAIL_SEPARATOR)
        .map_or(detailed, |(base, _)| base)
}

/// Declared signature of one signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSpec {
    name: Name,
    params: Vec<NativeType>,
    returns: Option<NativeType>,
}

impl SignalSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
        }
    }

    pub fn param(mut self, ty: NativeType) -> Self {
        self.params.push(ty);
        self
    }

    pub fn returns(mut self, ty: NativeType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter types, excluding the emitting instance
    pub fn params(&self) -> &[NativeType] {
        &self.params
    }

    pub fn return_type(&self) -> Option<NativeType> {
        self.returns
    }

    /// Values handed to a closure per emission (instance included)
    pub fn supplied_args(&self) -> usize {
        self.params.len() + 1
    }
}

/// Native type descriptor with single inheritance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    name: Name,
    ancestors: Vec<Name>,
    signals: Vec<SignalSpec>,
}

impl ObjectType {
    /// Root type with no ancestors
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ancestors: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Derived type inheriting `parent`'s ancestry and signals
    pub fn subclass(name: &str, parent: &ObjectType) -> Self {
        let mut ancestors = Vec::with_capacity(parent.ancestors.len() + 1);
        ancestors.push(parent.name.clone());
        ancestors.extend(parent.ancestors.iter().cloned());

        Self {
            name: name.into(),
            ancestors,
            signals: parent.signals.clone(),
        }
    }

    pub fn signal(mut self, spec: SignalSpec) -> Self {
        self.signals.retain(|s| s.name != spec.name);
        self.signals.push(spec);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn ancestors(&self) -> &[Name] {
        &self.ancestors
    }

    /// True if this type is `name` or derives from it
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.ancestors.iter().any(|a| a == name)
    }

    /// Look up a signal by (possibly detailed) name
    pub fn find_signal(&self, detailed: &str) -> Option<&SignalSpec> {
        let base = base_signal_name(detailed);
        self.signals.iter().find(|s| s.name == base)
    }
}

/// Reference to a live native object
#[derive(Debug, Clone)]
pub struct ObjectRef {
    id: ObjectId,
    ty: Arc<ObjectType>,
}

impl ObjectRef {
    pub fn new(id: ObjectId, ty: Arc<ObjectType>) -> Self {
        Self { id, ty }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn object_type(&self) -> &Arc<ObjectType> {
        &self.ty
    }

    pub fn type_name(&self) -> &Name {
        self.ty.name()
    }

    pub fn is_a(&self, name: &str) -> bool {
        self.ty.is_a(name)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObjectRef {}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.ty.name(), self.id)
    }
}
