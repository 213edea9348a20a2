//! Engine lifecycle error types
//!
//! Per-cycle failures (collector errors, gate timeouts) never surface here;
//! they become failed observations. These errors are the synchronous ones a
//! caller sees from construction and lifecycle calls.

use thiserror::Error;

/// Errors surfaced from monitor construction and lifecycle calls
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MonitorError {
    /// No tiers were configured
    #[error("no polling tiers configured")]
    NoTiers,

    /// Collector count does not match tier count
    #[error("{collectors} collectors supplied for {tiers} configured tiers")]
    CollectorCountMismatch { tiers: usize, collectors: usize },

    /// A tier was configured with a zero polling interval
    #[error("tier '{tier}' has a zero polling interval")]
    ZeroInterval { tier: String },

    /// Two tiers share the same name
    #[error("duplicate tier name '{tier}'")]
    DuplicateTierName { tier: String },

    /// A duration setting that must be non-zero was zero
    #[error("{field} must be non-zero")]
    ZeroDuration { field: &'static str },

    /// The session history capacity was zero
    #[error("session_history_capacity must be non-zero")]
    ZeroHistoryCapacity,

    /// `start()` called while already running
    #[error("monitor is already running")]
    AlreadyRunning,

    /// `stop()` called while not running
    #[error("monitor is not running")]
    NotRunning,
}
