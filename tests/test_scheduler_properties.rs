//! Concurrency properties of the tiered scheduler
//!
//! Mutual exclusion through the rate gate, per-tier re-entrancy, gate
//! timeouts, staggered startup and clean draining on stop, all under a
//! paused clock with instrumented collectors.

use presence_monitor::config::{MonitorConfig, TierConfig};
use presence_monitor::{Collector, PresenceMonitor};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{self, Instant};

mod test_helpers;
use test_helpers::ProbeCollector;

fn tier(name: &str, interval: Duration, stagger: Duration) -> TierConfig {
    TierConfig::builder(name, interval)
        .stagger(stagger)
        .build()
        .unwrap()
}

/// Three tiers all firing at once, each holding the backend for 300ms: at no
/// point are two collector invocations past the rate gate together.
#[tokio::test(start_paused = true)]
async fn test_collectors_never_overlap_across_tiers() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let config = MonitorConfig {
        tiers: vec![
            tier("a", Duration::from_secs(1), Duration::ZERO),
            tier("b", Duration::from_secs(1), Duration::ZERO),
            tier("c", Duration::from_secs(1), Duration::ZERO),
        ],
        ..MonitorConfig::default()
    };

    let probes: Vec<Arc<ProbeCollector>> = (0..3)
        .map(|_| {
            Arc::new(ProbeCollector::new(
                Arc::clone(&in_flight),
                Arc::clone(&peak),
                Duration::from_millis(300),
            ))
        })
        .collect();
    let collectors: Vec<Arc<dyn Collector>> = probes
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Collector>)
        .collect();

    let monitor = PresenceMonitor::new(config, collectors).unwrap();
    monitor.start().await.unwrap();
    time::sleep(Duration::from_secs(5)).await;
    monitor.stop().await.unwrap();

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    for probe in &probes {
        assert!(probe.started_count() >= 3, "every tier keeps polling");
    }
}

/// A collector that outlives its tier's interval: the next cycle never
/// starts until the previous one finished, and the overrun is counted.
#[tokio::test(start_paused = true)]
async fn test_per_tier_reentrancy_guard() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let config = MonitorConfig {
        tiers: vec![tier("fast", Duration::from_secs(1), Duration::ZERO)],
        ..MonitorConfig::default()
    };
    let probe = Arc::new(ProbeCollector::new(
        Arc::clone(&in_flight),
        Arc::clone(&peak),
        Duration::from_millis(2500),
    ));

    let monitor =
        PresenceMonitor::new(config, vec![Arc::clone(&probe) as Arc<dyn Collector>]).unwrap();
    monitor.start().await.unwrap();
    time::sleep(Duration::from_secs(10)).await;

    let stats = monitor.tier_stats().await;
    monitor.stop().await.unwrap();

    // Cycles run back-to-back at 0s, 3s, 6s, 9s: never concurrently
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(probe.started_count() <= 5);
    assert!(stats[0].overruns >= 2, "overlapped firings are made visible");
}

/// A tier that cannot get the gate within the configured timeout reports a
/// failed cycle instead of stalling or crashing.
#[tokio::test(start_paused = true)]
async fn test_gate_timeout_becomes_failed_cycle() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let config = MonitorConfig {
        tiers: vec![
            tier("hog", Duration::from_secs(20), Duration::ZERO),
            tier("starved", Duration::from_secs(20), Duration::from_secs(1)),
        ],
        gate_timeout: Duration::from_secs(2),
        ..MonitorConfig::default()
    };

    // The hog holds the gate for 5s starting at t=0; the starved tier tries
    // at t=1 and must give up at t=3
    let hog = Arc::new(ProbeCollector::new(
        Arc::clone(&in_flight),
        Arc::clone(&peak),
        Duration::from_secs(5),
    ));
    let starved = Arc::new(ProbeCollector::new(
        Arc::clone(&in_flight),
        Arc::clone(&peak),
        Duration::ZERO,
    ));
    let collectors: Vec<Arc<dyn Collector>> = vec![
        Arc::clone(&hog) as Arc<dyn Collector>,
        Arc::clone(&starved) as Arc<dyn Collector>,
    ];

    let monitor = PresenceMonitor::new(config, collectors).unwrap();
    let (_id, mut updates) = monitor.subscribe();
    monitor.start().await.unwrap();

    time::sleep(Duration::from_secs(6)).await;
    let stats = monitor.tier_stats().await;
    monitor.stop().await.unwrap();

    assert_eq!(stats[1].gate_timeouts, 1);
    assert_eq!(starved.started_count(), 0, "the starved cycle never ran");

    // The timeout was merged as a failed observation for that tier
    let mut saw_gate_failure = false;
    while let Ok(state) = updates.try_recv() {
        if state.has_error()
            && state
                .error_message()
                .is_some_and(|m| m.contains("rate gate"))
        {
            saw_gate_failure = true;
        }
    }
    assert!(saw_gate_failure);
}

/// stop() lets an in-flight cycle past the gate complete and merge exactly
/// once, and nothing fires afterwards.
#[tokio::test(start_paused = true)]
async fn test_stop_drains_in_flight_cycle() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let config = MonitorConfig {
        tiers: vec![tier("fast", Duration::from_secs(1), Duration::ZERO)],
        ..MonitorConfig::default()
    };
    let probe = Arc::new(ProbeCollector::new(
        Arc::clone(&in_flight),
        Arc::clone(&peak),
        Duration::from_secs(3),
    ));

    let monitor =
        PresenceMonitor::new(config, vec![Arc::clone(&probe) as Arc<dyn Collector>]).unwrap();
    let (_id, mut updates) = monitor.subscribe();
    monitor.start().await.unwrap();

    // Let the first cycle get past the gate, then stop mid-flight
    time::sleep(Duration::from_millis(100)).await;
    assert_eq!(probe.started_count(), 1);
    monitor.stop().await.unwrap();

    assert_eq!(probe.completed_count(), 1, "in-flight cycle ran to completion");

    // Exactly one merge, and silence afterwards
    assert!(updates.try_recv().is_ok());
    assert!(updates.try_recv().is_err());
    time::sleep(Duration::from_secs(10)).await;
    assert!(updates.try_recv().is_err());
    assert_eq!(probe.started_count(), 1);
}

/// With no explicit offsets, first firings are spread tier-index x delta
/// apart.
#[tokio::test(start_paused = true)]
async fn test_default_stagger_spreads_first_firings() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let config = MonitorConfig {
        tiers: vec![
            TierConfig::builder("a", Duration::from_secs(100)).build().unwrap(),
            TierConfig::builder("b", Duration::from_secs(100)).build().unwrap(),
            TierConfig::builder("c", Duration::from_secs(100)).build().unwrap(),
        ],
        stagger_delta: Duration::from_secs(2),
        ..MonitorConfig::default()
    };

    let probes: Vec<Arc<ProbeCollector>> = (0..3)
        .map(|_| {
            Arc::new(ProbeCollector::new(
                Arc::clone(&in_flight),
                Arc::clone(&peak),
                Duration::ZERO,
            ))
        })
        .collect();
    let collectors: Vec<Arc<dyn Collector>> = probes
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Collector>)
        .collect();

    let start = Instant::now();
    let monitor = PresenceMonitor::new(config, collectors).unwrap();
    monitor.start().await.unwrap();
    time::sleep(Duration::from_secs(10)).await;
    monitor.stop().await.unwrap();

    let offsets: Vec<Duration> = probes
        .iter()
        .map(|p| p.first_call().expect("every tier fired once") - start)
        .collect();
    assert_eq!(offsets[0], Duration::ZERO);
    assert_eq!(offsets[1], Duration::from_secs(2));
    assert_eq!(offsets[2], Duration::from_secs(4));
}

/// A panicking collector is contained: the cycle is recorded as a failure
/// and the tier keeps polling.
#[tokio::test(start_paused = true)]
async fn test_collector_panic_does_not_kill_the_tier() {
    use async_trait::async_trait;
    use presence_monitor::{CollectorError, PartialObservation, TierId};

    struct PanicOnceCollector {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Collector for PanicOnceCollector {
        async fn collect(&self, tier: TierId) -> Result<PartialObservation, CollectorError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("collector bug");
            }
            Ok(PartialObservation::new(tier))
        }
    }

    let config = MonitorConfig {
        tiers: vec![tier("fast", Duration::from_secs(1), Duration::ZERO)],
        ..MonitorConfig::default()
    };
    let collector = Arc::new(PanicOnceCollector {
        calls: AtomicUsize::new(0),
    });

    let monitor =
        PresenceMonitor::new(config, vec![Arc::clone(&collector) as Arc<dyn Collector>]).unwrap();
    let (_id, mut updates) = monitor.subscribe();
    monitor.start().await.unwrap();

    // First cycle panics, second succeeds
    let first = updates.recv().await.unwrap();
    assert!(first.has_error());
    assert!(first.error_message().unwrap().contains("panicked"));

    let second = updates.recv().await.unwrap();
    assert!(!second.has_error());

    let stats = monitor.tier_stats().await;
    assert_eq!(stats[0].failures, 1);
    assert!(stats[0].cycles >= 2);

    monitor.stop().await.unwrap();
}
