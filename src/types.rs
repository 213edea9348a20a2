//! Core identifier and field types shared across the engine
//!
//! Tier and subscriber identities plus the field model observations are
//! expressed in.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for name types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("tier name cannot be empty or whitespace")]
    EmptyTierName,

    #[error("field name cannot be empty or whitespace")]
    EmptyFieldName,
}

/// Macro to generate validated string newtypes.
///
/// Each generated type gets a validating `new()` constructor, `as_str()`,
/// `AsRef<str>`, `Borrow<str>` (for map lookups by `&str`), `Deref`,
/// `Display`, `TryFrom<String>`, and serde impls that re-validate on
/// deserialization.
macro_rules! validated_name {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident(String) {
            error_variant: $error_variant:ident,
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", stringify!($name), " after validation")]
            pub fn new(value: String) -> Result<Self, ValidationError> {
                if value.trim().is_empty() {
                    Err(ValidationError::$error_variant)
                } else {
                    Ok(Self(value))
                }
            }

            #[doc = concat!("Get the ", stringify!($name), " as a string slice")]
            #[must_use]
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

validated_name! {
    /// A validated tier name that cannot be empty or whitespace-only
    ///
    /// Used in configuration, logs and per-tier statistics.
    ///
    /// # Examples
    /// ```
    /// use presence_monitor::types::TierName;
    ///
    /// let name = TierName::new("fast".to_string()).unwrap();
    /// assert_eq!(name.as_str(), "fast");
    ///
    /// assert!(TierName::new("   ".to_string()).is_err());
    /// ```
    pub struct TierName(String) {
        error_variant: EmptyTierName,
    }
}

validated_name! {
    /// A validated observation field name that cannot be empty or
    /// whitespace-only
    pub struct FieldName(String) {
        error_variant: EmptyFieldName,
    }
}

/// Identifier for polling tiers
///
/// Tiers are addressed by their index in the configured tier list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TierId(usize);

impl TierId {
    /// Create a tier ID from a tier index
    #[must_use]
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Get the underlying index
    #[must_use]
    #[inline]
    pub const fn as_index(&self) -> usize {
        self.0
    }
}

impl From<usize> for TierId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier({})", self.0)
    }
}

/// Unique identifier for publisher subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Generate a new unique subscriber ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single observed field value
///
/// `Cleared` is an explicit, authoritative "no value": the producer affirmed
/// the field currently has none. That is different from a field being absent
/// from an observation (never attempted) and from an empty/zero value
/// (attempted, nothing learned), and only `Cleared` may wipe a previously
/// populated canonical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
    Cleared,
}

impl FieldValue {
    /// Whether this value may replace an existing canonical value
    ///
    /// Empty, zero and false are what a tier reports when it learned nothing
    /// for a field; `Cleared` is an explicit claim and always meaningful.
    #[must_use]
    pub fn is_meaningful(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            Self::Integer(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Flag(b) => *b,
            Self::Cleared => true,
        }
    }

    /// Text payload, if this is a non-empty text value
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Whether this is the explicit no-value marker
    #[must_use]
    pub const fn is_cleared(&self) -> bool {
        matches!(self, Self::Cleared)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(v) => write!(f, "{}", v),
            Self::Flag(b) => write!(f, "{}", b),
            Self::Cleared => write!(f, "<cleared>"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}
