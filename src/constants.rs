//! Constants for the service control manager client.
//!
//! This module centralizes the timing and buffer values used by the handle
//! lifecycle so callers can reason about worst-case latency.

use std::time::Duration;

// ============================================================================
// Start Synchronization Timing
// ============================================================================

/// Interval between status polls while a started service is still pending.
pub const START_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Maximum total time to wait for a started service to reach Running.
///
/// A service that accepts the start request but stays in start-pending past
/// this ceiling is reported as timed out; the caller decides whether to retry.
pub const START_TIMEOUT: Duration = Duration::from_millis(30_000);

// ============================================================================
// Configuration Query Protocol
// ============================================================================

/// Initial guess for the size of a service configuration record.
///
/// Most records fit; when one does not, the manager reports the exact size it
/// needs and the query is retried once at that size.
pub const CONFIG_BUFFER_INITIAL_SIZE: usize = 4096;

/// Maximum number of configuration query attempts.
///
/// The manager reports the exact required size on the first undersized
/// attempt, so the second attempt is sufficient unless the record is being
/// rewritten concurrently. A third undersized report is surfaced as a query
/// failure rather than retried.
pub const CONFIG_QUERY_MAX_ATTEMPTS: usize = 2;
