//! Shared helpers for integration tests
//!
//! Scripted and instrumented collectors standing in for a real backend
//! client.

#![allow(dead_code)]

use async_trait::async_trait;
use presence_monitor::session::fields;
use presence_monitor::{
    Collector, CollectorError, FieldName, FieldValue, PartialObservation, TierId,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Build a field name, panicking on invalid test input
pub fn field(name: &str) -> FieldName {
    FieldName::new(name.to_string()).unwrap()
}

/// One scripted polling outcome
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Successful observation carrying these fields
    Fields(Vec<(&'static str, FieldValue)>),
    /// Successful observation reporting this activity identifier
    Activity(Option<&'static str>),
    /// Failed cycle with this message
    Fail(&'static str),
}

/// Collector that replays a scripted sequence of outcomes, repeating the
/// final one once the script runs out
pub struct ScriptedCollector {
    script: Mutex<VecDeque<Outcome>>,
    delay: Option<Duration>,
    pub calls: AtomicU64,
}

impl ScriptedCollector {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            delay: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Make every invocation take this long (simulated backend latency)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Outcome {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or(Outcome::Fields(Vec::new()))
        }
    }
}

#[async_trait]
impl Collector for ScriptedCollector {
    async fn collect(&self, tier: TierId) -> Result<PartialObservation, CollectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_outcome() {
            Outcome::Fields(entries) => {
                let mut obs = PartialObservation::new(tier);
                for (name, value) in entries {
                    obs.set_field(field(name), value);
                }
                Ok(obs)
            }
            Outcome::Activity(Some(id)) => Ok(PartialObservation::new(tier)
                .with_field(field(fields::ACTIVITY), FieldValue::from(id))),
            Outcome::Activity(None) => Ok(PartialObservation::new(tier)
                .with_field(field(fields::ACTIVITY), FieldValue::Cleared)),
            Outcome::Fail(message) => Err(CollectorError::Backend(message.to_string())),
        }
    }
}

/// Collector that measures how many invocations are past the rate gate at
/// once, holding the gate for a configurable time
pub struct ProbeCollector {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    hold: Duration,
    pub started: AtomicU64,
    pub completed: AtomicU64,
    first_calls: Mutex<Vec<Instant>>,
}

impl ProbeCollector {
    /// Create a probe sharing the given gauges with its siblings
    pub fn new(in_flight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>, hold: Duration) -> Self {
        Self {
            in_flight,
            peak,
            hold,
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            first_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn started_count(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Instant of the first invocation, if any happened yet
    pub fn first_call(&self) -> Option<Instant> {
        self.first_calls.lock().unwrap().first().copied()
    }
}

#[async_trait]
impl Collector for ProbeCollector {
    async fn collect(&self, tier: TierId) -> Result<PartialObservation, CollectorError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.first_calls.lock().unwrap().push(Instant::now());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(PartialObservation::new(tier))
    }
}
