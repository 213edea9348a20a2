//! Field-level merge of partial observations into the canonical state
//!
//! The merge-and-publish step runs under one exclusive lock, so two tiers'
//! observations can never interleave partially and subscribers always see
//! merges in the order they happened.

use super::CanonicalState;
use crate::observation::PartialObservation;
use crate::publisher::Publisher;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Debug)]
struct AggregatorInner {
    state: CanonicalState,
    /// Most recent cycle outcome per tier: Some(message) while failing
    tier_failures: Vec<Option<String>>,
}

/// Merges tier observations into the canonical state and republishes
#[derive(Debug)]
pub struct StateAggregator {
    inner: Mutex<AggregatorInner>,
    publisher: Arc<Publisher>,
    tier_count: usize,
}

impl StateAggregator {
    /// Create an aggregator for `tier_count` tiers with an empty state
    #[must_use]
    pub fn new(tier_count: usize, publisher: Arc<Publisher>) -> Self {
        Self {
            inner: Mutex::new(AggregatorInner {
                state: CanonicalState::new(),
                tier_failures: vec![None; tier_count],
            }),
            publisher,
            tier_count,
        }
    }

    /// Merge one observation and publish the result
    ///
    /// Returns the post-merge snapshot, or `None` when the observation was
    /// malformed (unknown tier) and dropped whole.
    pub fn merge(&self, partial: &PartialObservation) -> Option<Arc<CanonicalState>> {
        let tier_index = partial.tier().as_index();
        if tier_index >= self.tier_count {
            warn!(
                "dropping observation from unknown {} ({} tiers configured)",
                partial.tier(),
                self.tier_count
            );
            return None;
        }

        let mut inner = self.inner.lock().expect("aggregator lock poisoned");

        let mut adopted = 0usize;
        for (name, value) in partial.fields() {
            if inner.state.apply_field(name, value) {
                adopted += 1;
            }
        }

        inner.tier_failures[tier_index] = partial.failure().map(str::to_owned);
        let has_error = inner.tier_failures.iter().any(Option::is_some);
        let message = if has_error {
            // Prefer the incoming failure; otherwise the message of whichever
            // tier is still failing
            partial
                .failure()
                .map(str::to_owned)
                .or_else(|| inner.tier_failures.iter().flatten().next().cloned())
        } else {
            None
        };
        inner.state.set_error(has_error, message);
        inner.state.set_last_updated(partial.taken_at());

        debug!(
            "merged observation from {}: {}/{} fields adopted, has_error={}",
            partial.tier(),
            adopted,
            partial.fields().len(),
            has_error
        );

        let snapshot = Arc::new(inner.state.clone());
        // Publish before releasing the lock so subscribers see merges in
        // merge order
        self.publisher.publish(Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Current snapshot (copy-on-read)
    #[must_use]
    pub fn snapshot(&self) -> Arc<CanonicalState> {
        let inner = self.inner.lock().expect("aggregator lock poisoned");
        Arc::new(inner.state.clone())
    }
}
