//! One-to-many fan-out of merged state snapshots
//!
//! Subscribers get their own queue instead of a callback slot, so a slow or
//! dropped consumer can never stall the merge path or its neighbours. Late
//! subscribers receive only future merges; there is no replay.

use crate::state::CanonicalState;
use crate::types::SubscriberId;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving end of a subscription
pub type StateReceiver = mpsc::UnboundedReceiver<Arc<CanonicalState>>;

#[derive(Debug)]
struct Subscriber {
    id: SubscriberId,
    sender: mpsc::UnboundedSender<Arc<CanonicalState>>,
}

/// Broadcasts canonical-state snapshots to registered subscribers
///
/// Delivery per merge follows registration order and is at-least-once for
/// every live subscriber. A dropped receiver is pruned on the next publish.
#[derive(Debug, Default)]
pub struct Publisher {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Publisher {
    /// Create a publisher with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; returns its id and the snapshot queue
    pub fn subscribe(&self) -> (SubscriberId, StateReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = SubscriberId::new();
        self.subscribers
            .lock()
            .expect("subscriber list lock poisoned")
            .push(Subscriber { id, sender });
        debug!("subscriber {} registered", id);
        (id, receiver)
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("subscriber list lock poisoned");
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    /// Deliver one snapshot to every live subscriber, pruning dead ones
    pub(crate) fn publish(&self, snapshot: Arc<CanonicalState>) {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("subscriber list lock poisoned");
        subscribers.retain(|s| {
            if s.sender.send(Arc::clone(&snapshot)).is_ok() {
                true
            } else {
                debug!("subscriber {} gone, pruning", s.id);
                false
            }
        });
    }

    /// Number of currently registered subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber list lock poisoned")
            .len()
    }
}
