//! Configuration type definitions
//!
//! This module contains the configuration structures the monitor consumes at
//! construction.

use crate::types::TierName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Helper for serializing Durations as whole seconds
pub mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Helper for serializing Option<Duration> as whole seconds
pub mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

/// Engine configuration consumed at monitor construction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Bound on waiting for the rate gate before a cycle is abandoned and
    /// reported as a timeout failure for that tier
    #[serde(with = "duration_serde")]
    pub gate_timeout: Duration,

    /// Gap between consecutive tiers' first firings, applied per tier index
    /// when a tier has no explicit stagger offset
    #[serde(with = "duration_serde")]
    pub stagger_delta: Duration,

    /// Closed session windows retained for rolling statistics
    pub session_history_capacity: usize,

    /// Polling tiers, one entry per independently-scheduled cadence
    pub tiers: Vec<TierConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tiers: Vec::new(),
            gate_timeout: super::defaults::gate_timeout(),
            stagger_delta: super::defaults::stagger_delta(),
            session_history_capacity: super::defaults::session_history_capacity(),
        }
    }
}

/// Configuration for a single polling tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierConfig {
    /// Name used in logs and statistics
    pub name: TierName,

    /// Polling interval
    #[serde(with = "duration_serde")]
    pub interval: Duration,

    /// Explicit first-firing offset; when absent, the scheduler derives one
    /// from the tier index and the configured stagger delta
    #[serde(
        with = "option_duration_serde",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stagger: Option<Duration>,
}

impl TierConfig {
    /// Create a builder for constructing a `TierConfig`
    ///
    /// # Examples
    ///
    /// ```
    /// use presence_monitor::config::TierConfig;
    /// use std::time::Duration;
    ///
    /// let tier = TierConfig::builder("fast", Duration::from_secs(1))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(tier.name.as_str(), "fast");
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>, interval: Duration) -> TierConfigBuilder {
        TierConfigBuilder::new(name, interval)
    }
}

/// Builder for constructing `TierConfig` instances
///
/// Mostly a convenience for tests and programmatic configuration, where
/// going through the validated `TierName` type is verbose.
pub struct TierConfigBuilder {
    name: String,
    interval: Duration,
    stagger: Option<Duration>,
}

impl TierConfigBuilder {
    /// Create a new builder with required parameters
    #[must_use]
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            stagger: None,
        }
    }

    /// Set an explicit first-firing offset
    #[must_use]
    pub fn stagger(mut self, offset: Duration) -> Self {
        self.stagger = Some(offset);
        self
    }

    /// Build the `TierConfig`
    ///
    /// # Errors
    /// Returns an error if the name is empty or the interval is zero.
    pub fn build(self) -> Result<TierConfig, anyhow::Error> {
        let name = TierName::new(self.name)?;
        if self.interval.is_zero() {
            anyhow::bail!("tier '{}' has a zero polling interval", name);
        }
        Ok(TierConfig {
            name,
            interval: self.interval,
            stagger: self.stagger,
        })
    }
}
