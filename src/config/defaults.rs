//! Default values for configuration fields
//!
//! This module centralizes all default value functions used in serde
//! deserialization.

use crate::constants;
use std::time::Duration;

/// Default bound on waiting for the rate gate
#[inline]
pub fn gate_timeout() -> Duration {
    constants::gate::DEFAULT_ACQUIRE_TIMEOUT
}

/// Default gap between consecutive tiers' first firings
#[inline]
pub fn stagger_delta() -> Duration {
    constants::scheduler::DEFAULT_STAGGER_DELTA
}

/// Default number of closed session windows retained for rolling stats
#[inline]
pub fn session_history_capacity() -> usize {
    constants::session::DEFAULT_HISTORY_CAPACITY
}
