//! Collector capability: the unit of work that performs one tier's poll
//!
//! The engine never talks to the external backend itself. Each tier is bound
//! to a collector supplied by the application, and every invocation happens
//! with the rate gate held.

use crate::observation::PartialObservation;
use crate::types::TierId;
use async_trait::async_trait;
use thiserror::Error;

/// Errors a collector can surface from one polling cycle
///
/// All variants are per-cycle failures: the scheduler converts them into a
/// failed [`PartialObservation`] and keeps polling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollectorError {
    /// The backend rejected or failed the request
    #[error("backend request failed: {0}")]
    Backend(String),

    /// The response arrived but could not be interpreted
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// Any other failure, with context attached by the application
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One tier's polling capability
///
/// `collect` is invoked once per scheduled cycle for the tier named by
/// `tier`, which the returned observation must be tagged with. Invocations
/// are serialized across all tiers by the rate gate, but implementations
/// must still be idempotent under repeated invocation and must not assume
/// any ordering relative to other tiers' collectors.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Perform one polling cycle and report what was observed
    async fn collect(&self, tier: TierId) -> Result<PartialObservation, CollectorError>;
}
