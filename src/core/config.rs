/*!
 * Bridge Configuration
 *
 * Runtime configuration for connect-time validation and emission-time arity
 */

use super::limits::{DEFAULT_CHECK_RECEIVER, ENV_ARITY_POLICY, ENV_CHECK_RECEIVER};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How emission arguments are matched against a callback's parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArityPolicy {
    /// Extra arguments are dropped; missing arguments fail
    #[default]
    Relaxed,
    /// Argument count must match the parameter count exactly
    Exact,
}

impl ArityPolicy {
    /// Number of arguments to hand to a callback declaring `declared` parameters,
    /// or `None` when `supplied` cannot satisfy it
    #[inline]
    pub fn accept(self, declared: usize, supplied: usize) -> Option<usize> {
        match self {
            ArityPolicy::Relaxed if supplied >= declared => Some(declared),
            ArityPolicy::Exact if supplied == declared => Some(declared),
            _ => None,
        }
    }
}

impl FromStr for ArityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relaxed" => Ok(ArityPolicy::Relaxed),
            "exact" | "strict" => Ok(ArityPolicy::Exact),
            other => Err(format!("unknown arity policy: {}", other)),
        }
    }
}

/// Bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Validate the callback receiver (and parameter count) at connect time
    pub check_receiver: bool,
    /// Argument matching at emission time
    pub arity: ArityPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            check_receiver: DEFAULT_CHECK_RECEIVER,
            arity: ArityPolicy::Relaxed,
        }
    }
}

impl BridgeConfig {
    /// Receiver checks on, exact arity
    pub const fn strict() -> Self {
        Self {
            check_receiver: true,
            arity: ArityPolicy::Exact,
        }
    }

    /// Defaults overridden by `BRIDGE_CHECK_RECEIVER` and `BRIDGE_ARITY`
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ENV_CHECK_RECEIVER) {
            config.check_receiver = matches!(value.trim(), "1" | "true" | "yes");
        }

        if let Ok(value) = std::env::var(ENV_ARITY_POLICY) {
            match value.parse() {
                Ok(policy) => config.arity = policy,
                Err(e) => log::warn!("Ignoring {}: {}", ENV_ARITY_POLICY, e),
            }
        }

        config
    }

    pub fn with_receiver_check(mut self, enabled: bool) -> Self {
        self.check_receiver = enabled;
        self
    }

    pub fn with_arity(mut self, arity: ArityPolicy) -> Self {
        self.arity = arity;
        self
    }
}
