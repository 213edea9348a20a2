//! Tiered scheduler: one staggered periodic polling task per tier
//!
//! Each tier runs its own timer loop. Cycles are awaited inside that loop,
//! so a tier can never have two collector invocations in flight; overlapped
//! firings are skipped and logged instead. Across tiers the only
//! serialization point is the rate gate. A single watch signal stops every
//! loop; in-flight cycles past the gate complete and merge before their task
//! exits.

use crate::collector::Collector;
use crate::config::{MonitorConfig, TierConfig};
use crate::gate::{GateError, RateGate};
use crate::observation::PartialObservation;
use crate::session::SessionTracker;
use crate::state::StateAggregator;
use crate::types::TierId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Per-tier cycle counters (atomic storage, snapshot on read)
#[derive(Debug, Default)]
pub(crate) struct TierCounters {
    cycles: AtomicU64,
    failures: AtomicU64,
    gate_timeouts: AtomicU64,
    overruns: AtomicU64,
}

impl TierCounters {
    pub(crate) fn snapshot(&self) -> TierStats {
        TierStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            gate_timeouts: self.gate_timeouts.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of one tier's scheduling counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TierStats {
    /// Cycles started (including abandoned and failed ones)
    pub cycles: u64,
    /// Cycles that ended in a failed observation
    pub failures: u64,
    /// Cycles abandoned because the rate gate stayed busy past its timeout
    pub gate_timeouts: u64,
    /// Cycles that ran longer than the tier's interval, skipping firings
    pub overruns: u64,
}

/// Everything one tier's timer loop needs
struct TierRuntime {
    id: TierId,
    config: TierConfig,
    collector: Arc<dyn Collector>,
    counters: Arc<TierCounters>,
}

/// Owns the per-tier timer tasks for one monitoring run
pub(crate) struct TieredScheduler {
    tiers: Vec<Arc<TierRuntime>>,
    gate: RateGate,
    aggregator: Arc<StateAggregator>,
    sessions: Arc<SessionTracker>,
    session_tier: TierId,
    stagger_delta: Duration,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl TieredScheduler {
    /// Build an inert scheduler; nothing fires until [`TieredScheduler::start`]
    pub(crate) fn new(
        config: &MonitorConfig,
        collectors: &[Arc<dyn Collector>],
        counters: &[Arc<TierCounters>],
        gate: RateGate,
        aggregator: Arc<StateAggregator>,
        sessions: Arc<SessionTracker>,
        session_tier: TierId,
    ) -> Self {
        let tiers = config
            .tiers
            .iter()
            .zip(collectors)
            .zip(counters)
            .enumerate()
            .map(|(index, ((tier_config, collector), tier_counters))| {
                Arc::new(TierRuntime {
                    id: TierId::from_index(index),
                    config: tier_config.clone(),
                    collector: Arc::clone(collector),
                    counters: Arc::clone(tier_counters),
                })
            })
            .collect();

        let (shutdown, _) = watch::channel(false);
        Self {
            tiers,
            gate,
            aggregator,
            sessions,
            session_tier,
            stagger_delta: config.stagger_delta,
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Arm every tier's timer
    ///
    /// First firings are staggered (explicit per-tier offset, else tier
    /// index x stagger delta) so no two tiers hit the backend simultaneously
    /// at startup.
    pub(crate) fn start(&mut self) {
        info!("starting {} polling tiers", self.tiers.len());
        for tier in &self.tiers {
            let stagger = tier
                .config
                .stagger
                .unwrap_or(self.stagger_delta * tier.id.as_index() as u32);
            let sessions = (tier.id == self.session_tier).then(|| Arc::clone(&self.sessions));

            info!(
                "tier '{}' armed: interval {:?}, first firing in {:?}",
                tier.config.name, tier.config.interval, stagger
            );
            self.handles.push(tokio::spawn(run_tier(
                Arc::clone(tier),
                self.gate.clone(),
                Arc::clone(&self.aggregator),
                sessions,
                stagger,
                self.shutdown.subscribe(),
            )));
        }
    }

    /// Disarm all timers and wait for in-flight cycles to finish
    ///
    /// A cycle already past the rate gate completes and merges exactly once;
    /// a cycle still waiting on the gate abandons without side effects.
    pub(crate) async fn stop(&mut self) {
        debug!("signalling {} tier tasks to stop", self.handles.len());
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("tier task ended abnormally: {}", e);
            }
        }
        info!("all tier tasks drained");
    }

    /// Non-blocking teardown for drop paths; does not wait for cycles
    pub(crate) fn abort(&mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

/// One tier's timer loop: staggered first firing, then fixed-interval ticks
async fn run_tier(
    tier: Arc<TierRuntime>,
    gate: RateGate,
    aggregator: Arc<StateAggregator>,
    sessions: Option<Arc<SessionTracker>>,
    stagger: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = time::sleep(stagger) => {}
        _ = shutdown.changed() => {
            debug!("tier '{}' stopped before first firing", tier.config.name);
            return;
        }
    }

    let mut interval = time::interval(tier.config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let started = Instant::now();
        run_cycle(&tier, &gate, &aggregator, sessions.as_deref(), &mut shutdown).await;

        if *shutdown.borrow() {
            break;
        }

        let took = started.elapsed();
        if took > tier.config.interval {
            // The interval's Skip behavior already dropped the missed
            // firings; the counter makes the overlap visible.
            tier.counters.overruns.fetch_add(1, Ordering::Relaxed);
            warn!(
                "tier '{}' cycle took {:?} (interval {:?}), missed firings skipped",
                tier.config.name, took, tier.config.interval
            );
        }
    }
    debug!("tier '{}' scheduler task stopped", tier.config.name);
}

/// One polling cycle: gate, collect, route
async fn run_cycle(
    tier: &TierRuntime,
    gate: &RateGate,
    aggregator: &StateAggregator,
    sessions: Option<&SessionTracker>,
    shutdown: &mut watch::Receiver<bool>,
) {
    tier.counters.cycles.fetch_add(1, Ordering::Relaxed);

    let permit = tokio::select! {
        acquired = gate.acquire() => match acquired {
            Ok(permit) => permit,
            Err(GateError::Timeout { timeout }) => {
                tier.counters.gate_timeouts.fetch_add(1, Ordering::Relaxed);
                tier.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "tier '{}' cycle abandoned: rate gate busy for {:?}",
                    tier.config.name, timeout
                );
                let observation = PartialObservation::failed(
                    tier.id,
                    format!("rate gate not acquired within {:?}", timeout),
                );
                route_observation(tier, aggregator, sessions, observation);
                return;
            }
            Err(GateError::Closed) => {
                debug!("tier '{}' cycle abandoned: gate closed", tier.config.name);
                return;
            }
        },
        _ = shutdown.changed() => {
            debug!(
                "tier '{}' abandoning cycle at the gate: shutdown",
                tier.config.name
            );
            return;
        }
    };

    // The collector runs in its own task so a panic is contained; the permit
    // travels with it and is released on every exit path.
    let collector = Arc::clone(&tier.collector);
    let tier_id = tier.id;
    let invocation = tokio::spawn(async move {
        let _permit = permit;
        collector.collect(tier_id).await
    });

    let observation = match invocation.await {
        Ok(Ok(observation)) if observation.tier() == tier.id => observation,
        Ok(Ok(observation)) => {
            tier.counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                "tier '{}' collector reported {} instead of {}, dropping its fields",
                tier.config.name,
                observation.tier(),
                tier.id
            );
            PartialObservation::failed(tier.id, "collector reported a foreign tier")
        }
        Ok(Err(e)) => {
            tier.counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!("tier '{}' collector failed: {}", tier.config.name, e);
            PartialObservation::failed(tier.id, e.to_string())
        }
        Err(join_error) => {
            tier.counters.failures.fetch_add(1, Ordering::Relaxed);
            error!(
                "tier '{}' collector panicked: {}",
                tier.config.name, join_error
            );
            PartialObservation::failed(tier.id, format!("collector panicked: {}", join_error))
        }
    };

    route_observation(tier, aggregator, sessions, observation);
}

/// Session tracking first (fast tier only), then the merge
fn route_observation(
    tier: &TierRuntime,
    aggregator: &StateAggregator,
    sessions: Option<&SessionTracker>,
    mut observation: PartialObservation,
) {
    if let Some(tracker) = sessions {
        tracker.observe(&mut observation);
    }
    if aggregator.merge(&observation).is_none() {
        warn!(
            "tier '{}' produced a malformed observation, dropped",
            tier.config.name
        );
    }
}
