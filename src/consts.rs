use std::time::Duration;

// -----------------------------------------------------------------------------
// System - Memory Allocation
// -----------------------------------------------------------------------------

/// Number of pre-allocated slots in a mailbox's pending queue.
pub const CAP_MAILBOX_BUFFER: usize = 8;

/// Number of pre-allocated slots in a mailbox's wait queue.
pub const CAP_WAIT_QUEUE: usize = 4;

/// Number of pre-allocated slots in a wheel worker's timer cache.
pub const CAP_WHEEL_CACHE: usize = 16;

// -----------------------------------------------------------------------------
// System - Timer Behavior
// -----------------------------------------------------------------------------

/// Default number of wheel workers spawned by a [`TimerWheel`].
///
/// [`TimerWheel`]: crate::timer::TimerWheel
pub const DEFAULT_WHEEL_WORKERS: usize = 1;

// -----------------------------------------------------------------------------
// System - Shutdown
// -----------------------------------------------------------------------------

/// How long to wait for a clean shutdown of wheel workers.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
