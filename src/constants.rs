//! Engine-wide tuning constants
//!
//! Configuration defaults reference these; nothing here is read at runtime
//! from anywhere else.

/// Scheduler timing constants
pub mod scheduler {
    use std::time::Duration;

    /// Gap between consecutive tiers' first firings when a tier has no
    /// explicit stagger offset (tier index x this delta)
    pub const DEFAULT_STAGGER_DELTA: Duration = Duration::from_secs(2);
}

/// Rate gate constants
pub mod gate {
    use std::time::Duration;

    /// Bound on waiting for the rate gate before a cycle is abandoned
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Session tracking constants
pub mod session {
    /// Closed session windows retained for rolling statistics
    pub const DEFAULT_HISTORY_CAPACITY: usize = 20;
}
