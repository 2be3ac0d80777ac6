/*!
 * Host Functions
 * Callables with a declared parameter list, the unit the bridge connects
 */

use super::value::{Value, ValueType};
use crate::core::types::Name;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by a host function body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Host function result
pub type HostResult<T> = Result<T, HostError>;

type Body = dyn Fn(&[Value]) -> HostResult<Value> + Send + Sync;

/// A host callable
///
/// The parameter list is what the bridge introspects: it decides how many
/// native arguments are forwarded and which type each is converted to.
/// Cloning shares the body.
#[derive(Clone)]
pub struct Function {
    name: Name,
    params: Arc<[ValueType]>,
    body: Arc<Body>,
}

impl Function {
    pub fn new<P, F>(name: &str, params: P, body: F) -> Self
    where
        P: IntoIterator<Item = ValueType>,
        F: Fn(&[Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: params.into_iter().collect(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Invoke the body; `args` must already match `params`
    pub fn call(&self, args: &[Value]) -> HostResult<Value> {
        debug_assert_eq!(args.len(), self.params.len());
        (self.body)(args)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func {}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", p)?;
        }
        f.write_str(")")
    }
}
