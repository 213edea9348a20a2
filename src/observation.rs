//! Partial observations produced by tier collectors
//!
//! One observation is the result of exactly one polling cycle. It never
//! claims authority over fields it did not attempt: a field absent from the
//! map is left untouched by the merge.

use crate::types::{FieldName, FieldValue, TierId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// The result of one collector invocation for one tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialObservation {
    tier: TierId,
    fields: HashMap<FieldName, FieldValue>,
    taken_at: SystemTime,
    failure: Option<String>,
}

impl PartialObservation {
    /// Create a successful observation with no fields yet
    #[must_use]
    pub fn new(tier: TierId) -> Self {
        Self {
            tier,
            fields: HashMap::new(),
            taken_at: SystemTime::now(),
            failure: None,
        }
    }

    /// Create a failed observation carrying an error message
    ///
    /// A failed cycle still produces an observation so the aggregator can
    /// surface the failure without touching previously merged fields.
    #[must_use]
    pub fn failed(tier: TierId, message: impl Into<String>) -> Self {
        Self {
            tier,
            fields: HashMap::new(),
            taken_at: SystemTime::now(),
            failure: Some(message.into()),
        }
    }

    /// Add a field value (builder-style)
    #[must_use]
    pub fn with_field(mut self, name: FieldName, value: FieldValue) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// Override the observation timestamp (builder-style)
    #[must_use]
    pub fn with_taken_at(mut self, taken_at: SystemTime) -> Self {
        self.taken_at = taken_at;
        self
    }

    /// Insert or replace a field value
    pub fn set_field(&mut self, name: FieldName, value: FieldValue) {
        self.fields.insert(name, value);
    }

    /// The tier this observation belongs to
    #[must_use]
    pub fn tier(&self) -> TierId {
        self.tier
    }

    /// When the observation was taken
    #[must_use]
    pub fn taken_at(&self) -> SystemTime {
        self.taken_at
    }

    /// All attempted fields
    #[must_use]
    pub fn fields(&self) -> &HashMap<FieldName, FieldValue> {
        &self.fields
    }

    /// Look up one attempted field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Whether this cycle failed
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// The failure message, if the cycle failed
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}
