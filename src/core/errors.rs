/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{CallSite, ClosureId, Name, ObjectId, SignalHandle};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bridge operation result
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Native collaborator result
pub type NativeResult<T> = Result<T, NativeError>;

/// Errors raised by the closure bridge
///
/// Configuration errors (`NotCallable`, `MissingReceiver`, `ReceiverMismatch`,
/// `TooManyParameters`, `InvalidCallback`) are returned from connect before any native state
/// exists. Emission-time errors never reach the native runtime; they are
/// delivered to the failure reporter instead.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BridgeError {
    #[error("Callback is not callable: got a {found} value")]
    #[diagnostic(
        code(bridge::not_callable),
        help("Pass a host function value; plain values cannot be connected to signals.")
    )]
    NotCallable { found: Name },

    #[error("{site}: callback should take the object receiver as its first parameter")]
    #[diagnostic(
        code(bridge::missing_receiver),
        help("Declare the emitting object as the first parameter instead of capturing it, to avoid reference cycles.")
    )]
    MissingReceiver { site: CallSite },

    #[error("{site}: receiver of type {object_type} is not convertible to expected type {expected}")]
    #[diagnostic(
        code(bridge::receiver_mismatch),
        help("The first callback parameter must accept the connecting object's type.")
    )]
    ReceiverMismatch {
        site: CallSite,
        expected: Name,
        object_type: Name,
    },

    #[error("{site}: callback declares {declared} parameters but signal {signal} supplies only {supplied}")]
    #[diagnostic(
        code(bridge::too_many_parameters),
        help("Remove the extra parameters; they can never be filled by this signal.")
    )]
    TooManyParameters {
        site: CallSite,
        signal: Name,
        declared: usize,
        supplied: usize,
    },

    #[error("{site}: {message}")]
    #[diagnostic(code(bridge::invalid_callback))]
    InvalidCallback { site: CallSite, message: String },

    #[error("Arity mismatch: callback declares {declared} parameters, emission supplied {supplied}")]
    #[diagnostic(
        code(bridge::arity_mismatch),
        help("The registered callback does not match the signal's signature.")
    )]
    ArityMismatch { declared: usize, supplied: usize },

    #[error("Cannot convert {position}: expected {expected}, found {found}")]
    #[diagnostic(code(bridge::conversion))]
    Conversion {
        position: Name,
        expected: Name,
        found: Name,
    },

    #[error("Callback failed: {0}")]
    #[diagnostic(code(bridge::host_error))]
    Host(String),

    #[error("Callback panicked: {0}")]
    #[diagnostic(
        code(bridge::callback_panicked),
        help("The panic was caught at the marshal boundary; the emission continued.")
    )]
    CallbackPanicked(String),

    #[error("Closure {0} is already registered")]
    #[diagnostic(
        code(bridge::duplicate_closure),
        help("The native runtime reused a closure identity that was never finalized.")
    )]
    DuplicateClosure(ClosureId),

    #[error(transparent)]
    #[diagnostic(code(bridge::native))]
    Native(#[from] NativeError),
}

impl BridgeError {
    /// True for errors raised synchronously at connect time
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotCallable { .. }
                | Self::MissingReceiver { .. }
                | Self::ReceiverMismatch { .. }
                | Self::TooManyParameters { .. }
                | Self::InvalidCallback { .. }
        )
    }
}

/// Errors reported by the native runtime collaborator
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum NativeError {
    #[error("Object {0} not found")]
    #[diagnostic(code(native::unknown_object))]
    UnknownObject(ObjectId),

    #[error("Signal {signal} is not defined for type {type_name}")]
    #[diagnostic(
        code(native::unknown_signal),
        help("Check the signal name, including any detail suffix.")
    )]
    UnknownSignal { type_name: Name, signal: Name },

    #[error("Closure {0} not found")]
    #[diagnostic(code(native::unknown_closure))]
    UnknownClosure(ClosureId),

    #[error("No handler {handle} connected on object {object}")]
    #[diagnostic(code(native::unknown_handler))]
    UnknownHandler { object: ObjectId, handle: SignalHandle },

    #[error("Signal {signal} expects {expected} arguments, got {got}")]
    #[diagnostic(code(native::invalid_arguments))]
    InvalidArguments {
        signal: Name,
        expected: usize,
        got: usize,
    },

    #[error("Closure {0} already has a marshal installed")]
    #[diagnostic(code(native::marshal_installed))]
    MarshalInstalled(ClosureId),
}
