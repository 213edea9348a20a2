//! Session inference from repeated point-in-time observations
//!
//! The backend has no notion of a session and emits no start/stop events;
//! all we get is the activity identifier visible at each poll. This module
//! turns that sequence into session windows: started when an identifier
//! appears, extended while it persists, closed when it changes or vanishes.
//! A failed poll is not evidence the activity stopped, so it never closes a
//! window.
//!
//! The tracker consumes the fastest tier's observations and writes its
//! derived fields (see [`fields`]) back into them before they reach the
//! merge, so session facts ride the normal canonical-state contract.

use crate::observation::PartialObservation;
use crate::types::FieldValue;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tracing::{debug, info};

/// Field names the tracker writes into the fast tier's observations
///
/// The fast tier's collector reports the raw activity identifier under
/// [`fields::ACTIVITY`]; everything else here is derived by the tracker.
pub mod fields {
    use crate::types::FieldName;

    /// Current activity identifier (collector-reported, tracker-normalized)
    pub const ACTIVITY: &str = "current_activity";
    /// Unix seconds the current session started at
    pub const STARTED_AT: &str = "session_started_at";
    /// Minutes elapsed in the current session
    pub const ELAPSED_MINUTES: &str = "session_elapsed_minutes";
    /// Sessions closed since monitoring started
    pub const SESSION_COUNT: &str = "session_count";
    /// Rolling average session length in minutes
    pub const AVERAGE_MINUTES: &str = "session_average_minutes";

    pub(crate) fn activity() -> FieldName {
        FieldName::new(ACTIVITY.to_string()).expect("static field name is non-empty")
    }

    pub(crate) fn started_at() -> FieldName {
        FieldName::new(STARTED_AT.to_string()).expect("static field name is non-empty")
    }

    pub(crate) fn elapsed_minutes() -> FieldName {
        FieldName::new(ELAPSED_MINUTES.to_string()).expect("static field name is non-empty")
    }

    pub(crate) fn session_count() -> FieldName {
        FieldName::new(SESSION_COUNT.to_string()).expect("static field name is non-empty")
    }

    pub(crate) fn average_minutes() -> FieldName {
        FieldName::new(AVERAGE_MINUTES.to_string()).expect("static field name is non-empty")
    }
}

/// One closed continuous-activity interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWindow {
    /// Activity identifier the window was open for
    pub activity: String,
    /// Wall-clock start of the window
    pub started_at: SystemTime,
    /// Span from the window's start to the poll that observed the change
    pub duration: Duration,
}

/// Rolling statistics over closed windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Sessions closed since monitoring started
    pub closed_total: u64,
    /// Average duration over the retained history
    pub average: Duration,
}

#[derive(Debug)]
struct ActiveSession {
    activity: String,
    /// Monotonic start; elapsed is always recomputed against this, so missed
    /// polls cannot make the session drift
    started_monotonic: Instant,
    started_at: SystemTime,
}

#[derive(Debug)]
struct TrackerInner {
    current: Option<ActiveSession>,
    history: VecDeque<SessionWindow>,
    closed_total: u64,
}

/// Infers session windows from the fast tier's observation stream
#[derive(Debug)]
pub struct SessionTracker {
    inner: Mutex<TrackerInner>,
    capacity: usize,
}

impl SessionTracker {
    /// Create a tracker retaining up to `capacity` closed windows
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                current: None,
                history: VecDeque::with_capacity(capacity),
                closed_total: 0,
            }),
            capacity,
        }
    }

    /// Update session state from one fast-tier observation and write the
    /// derived session fields into it before it reaches the merge
    pub fn observe(&self, observation: &mut PartialObservation) {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("session lock poisoned");

        if observation.is_failure() {
            // A failed poll says nothing about activity: leave the window
            // open, but still surface last-known elapsed time.
            if let Some(current) = &inner.current {
                observation.set_field(
                    fields::elapsed_minutes(),
                    FieldValue::Float(minutes(now - current.started_monotonic)),
                );
            }
            debug!("failed poll ignored for session transitions");
            return;
        }

        let observed = observation
            .field(fields::ACTIVITY)
            .and_then(FieldValue::as_text)
            .map(str::to_owned);
        let previous = inner.current.as_ref().map(|c| c.activity.clone());

        let mut closed_this_poll = false;
        match (previous, observed) {
            (None, None) => {}
            (None, Some(id)) => {
                start_session(&mut inner, id, now, observation.taken_at());
            }
            (Some(prev), Some(id)) if prev == id => {}
            (Some(_), next) => {
                close_session(&mut inner, now, self.capacity);
                closed_this_poll = true;
                if let Some(id) = next {
                    start_session(&mut inner, id, now, observation.taken_at());
                }
            }
        }

        write_session_fields(&inner, observation, now, closed_this_poll);
    }

    /// Rolling statistics over closed windows
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        let inner = self.inner.lock().expect("session lock poisoned");
        SessionStats {
            closed_total: inner.closed_total,
            average: average_duration(&inner.history),
        }
    }

    /// Retained closed windows, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<SessionWindow> {
        let inner = self.inner.lock().expect("session lock poisoned");
        inner.history.iter().cloned().collect()
    }

    /// Identifier of the currently open session, if any
    #[must_use]
    pub fn current_activity(&self) -> Option<String> {
        let inner = self.inner.lock().expect("session lock poisoned");
        inner.current.as_ref().map(|c| c.activity.clone())
    }

    /// Elapsed time of the currently open session, if any
    #[must_use]
    pub fn current_elapsed(&self) -> Option<Duration> {
        let inner = self.inner.lock().expect("session lock poisoned");
        inner
            .current
            .as_ref()
            .map(|c| Instant::now() - c.started_monotonic)
    }
}

fn start_session(inner: &mut TrackerInner, activity: String, now: Instant, taken_at: SystemTime) {
    info!("session started: '{}'", activity);
    inner.current = Some(ActiveSession {
        activity,
        started_monotonic: now,
        started_at: taken_at,
    });
}

fn close_session(inner: &mut TrackerInner, now: Instant, capacity: usize) {
    let Some(current) = inner.current.take() else {
        return;
    };
    let duration = now - current.started_monotonic;
    info!(
        "session closed: '{}' after {:.1} minutes",
        current.activity,
        minutes(duration)
    );
    inner.history.push_back(SessionWindow {
        activity: current.activity,
        started_at: current.started_at,
        duration,
    });
    while inner.history.len() > capacity {
        inner.history.pop_front();
    }
    inner.closed_total += 1;
}

fn write_session_fields(
    inner: &TrackerInner,
    observation: &mut PartialObservation,
    now: Instant,
    closed_this_poll: bool,
) {
    match &inner.current {
        Some(current) => {
            observation.set_field(
                fields::activity(),
                FieldValue::Text(current.activity.clone()),
            );
            observation.set_field(
                fields::started_at(),
                FieldValue::Integer(unix_seconds(current.started_at)),
            );
            let elapsed = if closed_this_poll {
                // A window opened on this very poll: explicitly reset elapsed
                // so the previous session's value cannot linger; the next
                // poll carries the first real number.
                FieldValue::Cleared
            } else {
                FieldValue::Float(minutes(now - current.started_monotonic))
            };
            observation.set_field(fields::elapsed_minutes(), elapsed);
        }
        None => {
            observation.set_field(fields::activity(), FieldValue::Cleared);
            observation.set_field(fields::started_at(), FieldValue::Cleared);
            observation.set_field(fields::elapsed_minutes(), FieldValue::Cleared);
        }
    }

    if inner.closed_total > 0 {
        observation.set_field(
            fields::session_count(),
            FieldValue::Integer(inner.closed_total as i64),
        );
        observation.set_field(
            fields::average_minutes(),
            FieldValue::Float(minutes(average_duration(&inner.history))),
        );
    }
}

fn minutes(duration: Duration) -> f64 {
    duration.as_secs_f64() / 60.0
}

fn unix_seconds(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

fn average_duration(history: &VecDeque<SessionWindow>) -> Duration {
    if history.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = history.iter().map(|w| w.duration).sum();
    total / history.len() as u32
}
