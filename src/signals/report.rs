/*!
 * Failure Reporting
 * Where emission-time callback failures go, since they cannot be returned
 */

use crate::core::errors::BridgeError;
use crate::core::limits::FAILURE_CHANNEL_CAPACITY;
use crate::core::types::{CallSite, ClosureId, Name, ObjectId};
use flume::{Receiver, Sender, TrySendError};
use log::{error, warn};
use serde::Serialize;
use std::fmt;

/// One failed callback invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackFailure {
    pub object: ObjectId,
    pub closure: ClosureId,
    /// Signal name, or "closure" for floating closures
    pub signal: Name,
    /// Where the callback was connected from
    pub site: CallSite,
    pub error: BridgeError,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} callback on {} failed: {}",
            self.site, self.signal, self.object, self.error
        )
    }
}

/// Sink for callback failures
///
/// Called on the emitting thread, inside the native emission. Implementations
/// must not block for long and must not panic.
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: CallbackFailure);
}

impl<F> FailureReporter for F
where
    F: Fn(CallbackFailure) + Send + Sync,
{
    fn report(&self, failure: CallbackFailure) {
        self(failure)
    }
}

/// Default reporter: one error log line per failure
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, failure: CallbackFailure) {
        error!("{}", failure);
    }
}

/// Forwards failures to a bounded channel
///
/// When the channel is full the failure is logged and dropped so the
/// emission never waits on a consumer.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<CallbackFailure>,
}

impl ChannelReporter {
    pub fn new(capacity: usize) -> (Self, Receiver<CallbackFailure>) {
        let (tx, rx) = flume::bounded(capacity);
        (Self { tx }, rx)
    }

    pub fn with_default_capacity() -> (Self, Receiver<CallbackFailure>) {
        Self::new(FAILURE_CHANNEL_CAPACITY)
    }
}

impl FailureReporter for ChannelReporter {
    fn report(&self, failure: CallbackFailure) {
        match self.tx.try_send(failure) {
            Ok(()) => {}
            Err(TrySendError::Full(failure)) => {
                warn!("Failure channel full, dropping: {}", failure);
            }
            Err(TrySendError::Disconnected(failure)) => {
                error!("{}", failure);
            }
        }
    }
}
