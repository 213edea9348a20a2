//! Monitor facade: lifecycle, wiring, and the read surface
//!
//! One `PresenceMonitor` owns everything for one monitored backend identity:
//! the rate gate, the per-tier scheduler, the aggregator and the session
//! tracker. Canonical state belongs to a single run; stopping tears it down
//! and a later start begins from scratch.

use crate::collector::Collector;
use crate::config::{MonitorConfig, validate_config};
use crate::error::MonitorError;
use crate::gate::RateGate;
use crate::publisher::{Publisher, StateReceiver};
use crate::scheduler::{TierCounters, TierStats, TieredScheduler};
use crate::session::{SessionStats, SessionTracker, SessionWindow};
use crate::state::{CanonicalState, StateAggregator};
use crate::types::{SubscriberId, TierId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

struct Running {
    scheduler: TieredScheduler,
    aggregator: Arc<StateAggregator>,
    sessions: Arc<SessionTracker>,
    counters: Vec<Arc<TierCounters>>,
}

/// The polling engine facade
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use presence_monitor::config::{MonitorConfig, TierConfig};
/// use presence_monitor::{
///     Collector, CollectorError, PartialObservation, PresenceMonitor, TierId,
/// };
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct ProfileCollector;
///
/// #[async_trait]
/// impl Collector for ProfileCollector {
///     async fn collect(&self, tier: TierId) -> Result<PartialObservation, CollectorError> {
///         // Call the backend here; report what was learned
///         Ok(PartialObservation::new(tier))
///     }
/// }
///
/// # async fn run() -> anyhow::Result<()> {
/// let config = MonitorConfig {
///     tiers: vec![TierConfig::builder("fast", Duration::from_secs(1)).build()?],
///     ..MonitorConfig::default()
/// };
/// let monitor = PresenceMonitor::new(config, vec![Arc::new(ProfileCollector)])?;
/// let (_id, mut updates) = monitor.subscribe();
/// monitor.start().await?;
/// while let Some(state) = updates.recv().await {
///     println!("merged: {} fields", state.fields().len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct PresenceMonitor {
    config: MonitorConfig,
    collectors: Vec<Arc<dyn Collector>>,
    session_tier: TierId,
    publisher: Arc<Publisher>,
    running: Mutex<Option<Running>>,
}

impl PresenceMonitor {
    /// Create a monitor from validated configuration and one collector per
    /// tier (same order as `config.tiers`)
    ///
    /// # Errors
    /// Returns a startup error when the configuration is invalid or the
    /// collector count does not match the tier count. The monitor never
    /// enters the running state in that case.
    pub fn new(
        config: MonitorConfig,
        collectors: Vec<Arc<dyn Collector>>,
    ) -> Result<Self, MonitorError> {
        validate_config(&config)?;
        if collectors.len() != config.tiers.len() {
            return Err(MonitorError::CollectorCountMismatch {
                tiers: config.tiers.len(),
                collectors: collectors.len(),
            });
        }

        let session_tier = session_tier(&config);
        Ok(Self {
            config,
            collectors,
            session_tier,
            publisher: Arc::new(Publisher::new()),
            running: Mutex::new(None),
        })
    }

    /// Arm every tier's timer and begin polling
    ///
    /// Canonical state and session history are created fresh on every start;
    /// nothing is carried over from a previous run.
    ///
    /// # Errors
    /// Returns [`MonitorError::AlreadyRunning`] when already started.
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let aggregator = Arc::new(StateAggregator::new(
            self.config.tiers.len(),
            Arc::clone(&self.publisher),
        ));
        let sessions = Arc::new(SessionTracker::new(self.config.session_history_capacity));
        let counters: Vec<Arc<TierCounters>> = (0..self.config.tiers.len())
            .map(|_| Arc::new(TierCounters::default()))
            .collect();

        let mut scheduler = TieredScheduler::new(
            &self.config,
            &self.collectors,
            &counters,
            RateGate::new(self.config.gate_timeout),
            Arc::clone(&aggregator),
            Arc::clone(&sessions),
            self.session_tier,
        );
        scheduler.start();

        info!(
            "presence monitor started: {} tiers, '{}' drives session tracking",
            self.config.tiers.len(),
            self.config.tiers[self.session_tier.as_index()].name
        );
        *running = Some(Running {
            scheduler,
            aggregator,
            sessions,
            counters,
        });
        Ok(())
    }

    /// Stop polling: disarm every timer and drain in-flight cycles
    ///
    /// # Errors
    /// Returns [`MonitorError::NotRunning`] when not started.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let mut running = self.running.lock().await;
        let Some(mut run) = running.take() else {
            return Err(MonitorError::NotRunning);
        };
        run.scheduler.stop().await;
        info!("presence monitor stopped");
        Ok(())
    }

    /// Stop if running and release resources; safe to call repeatedly
    pub async fn dispose(&self) {
        match self.stop().await {
            Ok(()) | Err(MonitorError::NotRunning) => {}
            Err(e) => warn!("dispose: {}", e),
        }
    }

    /// Whether the scheduler is currently running
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Current canonical snapshot, when running
    pub async fn state(&self) -> Option<Arc<CanonicalState>> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|run| run.aggregator.snapshot())
    }

    /// Register for a snapshot after every merge (no replay of past merges)
    pub fn subscribe(&self) -> (SubscriberId, StateReceiver) {
        self.publisher.subscribe()
    }

    /// Remove a subscription; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.publisher.unsubscribe(id)
    }

    /// Per-tier scheduling counters, index-aligned with the configured
    /// tiers; empty when not running
    pub async fn tier_stats(&self) -> Vec<TierStats> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|run| run.counters.iter().map(|c| c.snapshot()).collect())
            .unwrap_or_default()
    }

    /// Rolling session statistics, when running
    pub async fn session_stats(&self) -> Option<SessionStats> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|run| run.sessions.stats())
    }

    /// Retained closed session windows, oldest first; empty when not running
    pub async fn session_history(&self) -> Vec<SessionWindow> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|run| run.sessions.history())
            .unwrap_or_default()
    }

    /// The configuration this monitor was built with
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// The tier whose observations drive session tracking
    #[must_use]
    pub fn session_tier(&self) -> TierId {
        self.session_tier
    }
}

impl Drop for PresenceMonitor {
    fn drop(&mut self) {
        // Best effort: a monitor dropped while running cannot await its
        // tasks, so they are aborted instead.
        if let Ok(mut guard) = self.running.try_lock() {
            if let Some(mut run) = guard.take() {
                run.scheduler.abort();
            }
        }
    }
}

/// The session-driving tier: smallest interval, lowest index on ties
fn session_tier(config: &MonitorConfig) -> TierId {
    let index = config
        .tiers
        .iter()
        .enumerate()
        .min_by_key(|(index, tier)| (tier.interval, *index))
        .map(|(index, _)| index)
        .unwrap_or(0);
    TierId::from_index(index)
}
