//! Tiered polling engine for rate-limited, pull-only backends
//!
//! The external source is a third-party web API that cannot push: every fact
//! has to be polled, the backend tolerates exactly one outstanding call, and
//! different facts deserve different cadences. This crate runs N independent
//! polling tiers against that constraint and turns their partial,
//! possibly-failing observations into one coherent view:
//!
//! - [`gate::RateGate`] serializes every backend call across tiers
//! - [`scheduler`] drives one staggered periodic timer per tier, with at
//!   most one in-flight cycle per tier
//! - [`state::StateAggregator`] merges observations field-by-field and
//!   never lets a failed or partial cycle blank out known-good data
//! - [`session::SessionTracker`] infers continuous activity sessions purely
//!   from repeated snapshots, since the backend has no session events
//! - [`publisher::Publisher`] fans merged snapshots out to consumers
//!
//! [`PresenceMonitor`] wires all of it together behind a start/stop
//! lifecycle; applications supply one [`Collector`] per tier.

pub mod collector;
pub mod config;
pub mod constants;
pub mod error;
pub mod gate;
pub mod logging;
pub mod monitor;
pub mod observation;
pub mod publisher;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod types;

pub use collector::{Collector, CollectorError};
pub use config::{MonitorConfig, TierConfig, load_config, load_config_with_fallback};
pub use error::MonitorError;
pub use gate::{GateError, GatePermit, RateGate};
pub use monitor::PresenceMonitor;
pub use observation::PartialObservation;
pub use publisher::{Publisher, StateReceiver};
pub use scheduler::TierStats;
pub use session::{SessionStats, SessionTracker, SessionWindow};
pub use state::{CanonicalState, StateAggregator};
pub use types::{FieldName, FieldValue, SubscriberId, TierId, TierName};
