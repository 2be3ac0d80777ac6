/*!
 * Bridge Limits and Constants
 *
 * Centralized location for the bridge's tunables and magic numbers.
 */

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Environment variable enabling the strict receiver check ("1"/"true")
pub const ENV_CHECK_RECEIVER: &str = "BRIDGE_CHECK_RECEIVER";

/// Environment variable selecting the arity policy ("relaxed"/"exact")
pub const ENV_ARITY_POLICY: &str = "BRIDGE_ARITY";

/// Environment variable switching tracing output to JSON ("1"/"true")
pub const ENV_TRACE_JSON: &str = "BRIDGE_TRACE_JSON";

/// Receiver checks are a debugging aid and start disabled
pub const DEFAULT_CHECK_RECEIVER: bool = false;

// =============================================================================
// REGISTRY SIZING
// =============================================================================

/// Initial capacity of a per-object closure registry
/// Most objects carry a few handlers; growth is amortized beyond that
pub const REGISTRY_INITIAL_CAPACITY: usize = 4;

/// Initial capacity of the association maps
pub const ASSOCIATION_INITIAL_CAPACITY: usize = 4;

// =============================================================================
// FAILURE REPORTING
// =============================================================================

/// Default bound of a channel-backed failure reporter
/// Reports beyond this are dropped (and logged) rather than blocking emission
pub const FAILURE_CHANNEL_CAPACITY: usize = 1024;

/// Longest panic message kept in a failure report
pub const MAX_PANIC_MESSAGE_LEN: usize = 512;

// =============================================================================
// NATIVE ALLOCATION
// =============================================================================

/// Alignment of closure identities handed out by the local runtime
/// Mirrors pointer alignment so identities look like addresses
pub const CLOSURE_ID_ALIGN: usize = 16;

/// First closure identity handed out by the local runtime
pub const CLOSURE_ID_BASE: usize = 0x1000;
