//! Rate gate: single-slot mutual exclusion over the external backend
//!
//! The backend allows one outstanding call for the whole process, regardless
//! of which tier is asking. Every collector invocation goes through this
//! gate.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Errors acquiring the rate gate
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GateError {
    /// The configured acquisition timeout elapsed before the gate freed up
    #[error("rate gate not acquired within {timeout:?}")]
    Timeout { timeout: Duration },

    /// The gate was closed by shutdown
    #[error("rate gate closed")]
    Closed,
}

/// Held while a backend call is in flight; releases the gate on drop
///
/// Dropping the permit is the only release path, so the gate is released on
/// success, failure and panic alike.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

/// Single-permit gate serializing all backend calls across tiers
///
/// Waiters queue FIFO, so no tier is starved indefinitely: each tier
/// acquires the gate after at most the other tiers' in-flight cycles.
#[derive(Debug, Clone)]
pub struct RateGate {
    semaphore: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl RateGate {
    /// Create a gate with the given acquisition timeout
    #[must_use]
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            acquire_timeout,
        }
    }

    /// Wait for exclusive backend access, bounded by the acquisition timeout
    ///
    /// # Errors
    /// Returns [`GateError::Timeout`] when the gate stayed busy past the
    /// configured timeout, [`GateError::Closed`] after [`RateGate::close`].
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let acquired = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await;

        match acquired {
            Ok(Ok(permit)) => Ok(GatePermit { _permit: permit }),
            Ok(Err(_)) => Err(GateError::Closed),
            Err(_) => Err(GateError::Timeout {
                timeout: self.acquire_timeout,
            }),
        }
    }

    /// Close the gate permanently; pending and future acquires fail fast
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether no call currently holds the gate
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.semaphore.available_permits() == 1
    }

    /// The configured acquisition timeout
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}
