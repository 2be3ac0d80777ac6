/*!
 * Callable Wrapper
 * A host function plus the diagnostic context it was connected with
 */

use crate::core::config::ArityPolicy;
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::types::{CallSite, Name};
use crate::host::{Function, Value};
use crate::marshal::ArgConverter;
use crate::native::{NativeValue, ObjectType};

/// Immutable wrapper around one connected host function
#[derive(Debug)]
pub struct Callback {
    func: Function,
    site: CallSite,
    label: Name,
}

impl Callback {
    /// Wrap a host value; anything but a function is a configuration error
    pub fn from_value(value: Value, site: CallSite, label: &str) -> BridgeResult<Self> {
        match value {
            Value::Function(func) => Ok(Self::new(func, site, label)),
            other => Err(BridgeError::NotCallable {
                found: other.type_name(),
            }),
        }
    }

    pub fn new(func: Function, site: CallSite, label: &str) -> Self {
        Self {
            func,
            site,
            label: label.into(),
        }
    }

    pub fn function(&self) -> &Function {
        &self.func
    }

    pub fn site(&self) -> &CallSite {
        &self.site
    }

    /// Signal name (or "closure") used in failure reports
    pub fn label(&self) -> &Name {
        &self.label
    }

    pub fn arity(&self) -> usize {
        self.func.arity()
    }

    /// Configuration error located at the connect call site
    pub fn fail(&self, message: impl Into<String>) -> BridgeError {
        BridgeError::InvalidCallback {
            site: self.site.clone(),
            message: message.into(),
        }
    }

    /// First parameter must accept instances of `receiver`
    pub fn check_receiver(&self, receiver: &ObjectType) -> BridgeResult<()> {
        let first = self
            .func
            .params()
            .first()
            .ok_or_else(|| BridgeError::MissingReceiver {
                site: self.site.clone(),
            })?;

        if first.accepts_instance_of(receiver) {
            Ok(())
        } else {
            Err(BridgeError::ReceiverMismatch {
                site: self.site.clone(),
                expected: first.to_string().into(),
                object_type: receiver.name().clone(),
            })
        }
    }

    /// Parameter list must fit in what `signal` supplies per emission
    pub fn check_arity(&self, signal: &str, supplied: usize) -> BridgeResult<()> {
        if self.arity() > supplied {
            return Err(BridgeError::TooManyParameters {
                site: self.site.clone(),
                signal: signal.into(),
                declared: self.arity(),
                supplied,
            });
        }
        Ok(())
    }

    /// Convert emission arguments and call the function
    pub fn invoke(
        &self,
        args: &[NativeValue],
        converter: &dyn ArgConverter,
        policy: ArityPolicy,
    ) -> BridgeResult<Value> {
        let declared = self.arity();
        let take = policy
            .accept(declared, args.len())
            .ok_or(BridgeError::ArityMismatch {
                declared,
                supplied: args.len(),
            })?;

        let converted = args[..take]
            .iter()
            .zip(self.func.params())
            .enumerate()
            .map(|(i, (arg, want))| {
                converter
                    .to_host(arg, want)
                    .ok_or_else(|| BridgeError::Conversion {
                        position: format!("argument {}", i).into(),
                        expected: want.to_string().into(),
                        found: arg.type_name(),
                    })
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        self.func
            .call(&converted)
            .map_err(|e| BridgeError::Host(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ObjectId;
    use crate::host::{HostError, ValueType};
    use crate::marshal::StandardConverter;
    use crate::native::ObjectRef;
    use std::sync::Arc;

    fn button() -> Arc<ObjectType> {
        ObjectType::new("Button").build()
    }

    fn wrap(func: Function) -> Callback {
        Callback::new(func, CallSite::capture(), "clicked")
    }

    #[test]
    fn test_non_function_is_rejected() {
        let err = Callback::from_value(Value::Int(3), CallSite::capture(), "clicked").unwrap_err();
        assert_eq!(err, BridgeError::NotCallable { found: "int".into() });
    }

    #[test]
    fn test_fail_carries_site() {
        let cb = wrap(Function::new("f", [], |_| Ok(Value::Nil)));
        let err = cb.fail("signal name is empty");
        assert!(err.is_configuration());
        assert!(err.to_string().ends_with(": signal name is empty"));
        assert!(err.to_string().starts_with(cb.site().file.as_str()));
    }

    #[test]
    fn test_receiver_checks() {
        let none = wrap(Function::new("f", [], |_| Ok(Value::Nil)));
        assert!(matches!(
            none.check_receiver(&button()),
            Err(BridgeError::MissingReceiver { .. })
        ));

        let wrong = wrap(Function::new("f", [ValueType::Int], |_| Ok(Value::Nil)));
        assert!(matches!(
            wrong.check_receiver(&button()),
            Err(BridgeError::ReceiverMismatch { .. })
        ));

        let right = wrap(Function::new(
            "f",
            [ValueType::object("Button")],
            |_| Ok(Value::Nil),
        ));
        assert!(right.check_receiver(&button()).is_ok());
    }

    #[test]
    fn test_invoke_truncates_under_relaxed_policy() {
        let cb = wrap(Function::new("f", [ValueType::object("Button")], |args| {
            assert_eq!(args.len(), 1);
            Ok(Value::Bool(true))
        }));
        let obj = ObjectRef::new(ObjectId::from_raw(1), button());
        let args = [
            NativeValue::Object(obj),
            NativeValue::Int(1),
            NativeValue::Int(2),
        ];

        let result = cb.invoke(&args, &StandardConverter, ArityPolicy::Relaxed);
        assert_eq!(result, Ok(Value::Bool(true)));

        let result = cb.invoke(&args, &StandardConverter, ArityPolicy::Exact);
        assert_eq!(
            result,
            Err(BridgeError::ArityMismatch {
                declared: 1,
                supplied: 3
            })
        );
    }

    #[test]
    fn test_invoke_reports_conversion_position() {
        let cb = wrap(Function::new("f", [ValueType::Any, ValueType::Str], |_| {
            Ok(Value::Nil)
        }));
        let err = cb
            .invoke(
                &[NativeValue::Int(1), NativeValue::Int(2)],
                &StandardConverter,
                ArityPolicy::Relaxed,
            )
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::Conversion {
                position: "argument 1".into(),
                expected: "string".into(),
                found: "gint64".into(),
            }
        );
    }

    #[test]
    fn test_host_error_is_wrapped() {
        let cb = wrap(Function::new("f", [], |_| Err(HostError::new("boom"))));
        assert_eq!(
            cb.invoke(&[], &StandardConverter, ArityPolicy::Relaxed),
            Err(BridgeError::Host("boom".into()))
        );
    }
}
