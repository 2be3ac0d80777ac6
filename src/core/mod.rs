/*!
 * Core Module
 * Identity types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod shard_manager;
pub mod types;

// Re-export for convenience
pub use config::{ArityPolicy, BridgeConfig};
pub use errors::*;
pub use shard_manager::{ShardManager, WorkloadProfile};
pub use types::*;
