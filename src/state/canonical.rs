//! The merged, authoritative current-state snapshot

use crate::types::{FieldName, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Process-wide merged view of everything the tiers have observed
///
/// Mutated only by the aggregator; everyone else reads cloned snapshots.
/// Lives for one monitoring run and is rebuilt from scratch on restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalState {
    fields: HashMap<FieldName, FieldValue>,
    last_updated: Option<SystemTime>,
    has_error: bool,
    error_message: Option<String>,
}

impl CanonicalState {
    /// Create an empty state with no fields and no error
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Apply one observed field under keep-last-known-good semantics
    ///
    /// A brand-new field is adopted even when empty; an existing field is
    /// only replaced by a meaningful value. Returns whether the value was
    /// adopted.
    pub(crate) fn apply_field(&mut self, name: &FieldName, value: &FieldValue) -> bool {
        let adopt = match self.fields.get(name) {
            None => true,
            Some(_) => value.is_meaningful(),
        };
        if adopt {
            self.fields.insert(name.clone(), value.clone());
        }
        adopt
    }

    pub(crate) fn set_error(&mut self, has_error: bool, message: Option<String>) {
        self.has_error = has_error;
        self.error_message = message;
    }

    pub(crate) fn set_last_updated(&mut self, at: SystemTime) {
        self.last_updated = Some(at);
    }

    /// Look up one merged field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// All merged fields
    #[must_use]
    pub fn fields(&self) -> &HashMap<FieldName, FieldValue> {
        &self.fields
    }

    /// Timestamp of the most recent merge, if any observation arrived yet
    #[must_use]
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.last_updated
    }

    /// Whether any tier's most recent cycle failed
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// The most recent failure message while any tier is failing
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Whether no observation has contributed any field yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FieldName {
        FieldName::new(name.to_string()).unwrap()
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = CanonicalState::new();
        assert!(state.is_empty());
        assert!(!state.has_error());
        assert_eq!(state.last_updated(), None);
    }

    #[test]
    fn test_new_field_adopted_even_when_empty() {
        let mut state = CanonicalState::new();
        assert!(state.apply_field(&field("player_name"), &FieldValue::Text(String::new())));
        assert_eq!(
            state.field("player_name"),
            Some(&FieldValue::Text(String::new()))
        );
    }

    #[test]
    fn test_existing_field_kept_against_empty() {
        let mut state = CanonicalState::new();
        state.apply_field(&field("player_name"), &FieldValue::from("orin"));

        assert!(!state.apply_field(&field("player_name"), &FieldValue::Text(String::new())));
        assert_eq!(state.field("player_name"), Some(&FieldValue::from("orin")));
    }

    #[test]
    fn test_existing_field_kept_against_zero() {
        let mut state = CanonicalState::new();
        state.apply_field(&field("friend_count"), &FieldValue::Integer(12));

        assert!(!state.apply_field(&field("friend_count"), &FieldValue::Integer(0)));
        assert_eq!(state.field("friend_count"), Some(&FieldValue::Integer(12)));
    }

    #[test]
    fn test_meaningful_value_replaces() {
        let mut state = CanonicalState::new();
        state.apply_field(&field("friend_count"), &FieldValue::Integer(12));

        assert!(state.apply_field(&field("friend_count"), &FieldValue::Integer(13)));
        assert_eq!(state.field("friend_count"), Some(&FieldValue::Integer(13)));
    }

    #[test]
    fn test_cleared_replaces_existing_value() {
        let mut state = CanonicalState::new();
        state.apply_field(&field("current_activity"), &FieldValue::from("Game1"));

        assert!(state.apply_field(&field("current_activity"), &FieldValue::Cleared));
        assert_eq!(
            state.field("current_activity"),
            Some(&FieldValue::Cleared)
        );
    }
}
