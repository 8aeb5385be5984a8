//! Certainty scores and fact provenance.
//!
//! Certainty is not part of the pure logical model; it describes how a fact
//! entered the system. It is carried as an optional [`Annotation`] on stored
//! facts and only consulted when contradictory facts must be weighed.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated certainty value in `[0.0, 1.0]`.
///
/// # Examples
///
/// ```
/// use kyrologic::Certainty;
///
/// let c = Certainty::new(0.9).unwrap();
/// assert_eq!(c.value(), 0.9);
/// assert!(Certainty::new(1.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Certainty(f32);

impl Certainty {
    /// Minimum valid certainty.
    pub const MIN_VALUE: f32 = 0.0;

    /// Maximum valid certainty.
    pub const MAX_VALUE: f32 = 1.0;

    /// Creates a certainty with validation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::CertaintyOutOfRange` if the value is NaN or
    /// outside `[0.0, 1.0]`.
    pub fn new(value: f32) -> Result<Self, ValidationError> {
        if value.is_nan() || !(Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value) {
            return Err(ValidationError::CertaintyOutOfRange { value });
        }
        // Adding 0.0 turns -0.0 into 0.0 so both hash alike.
        Ok(Self(value + 0.0))
    }

    /// Full certainty. Unannotated facts weigh this much.
    #[must_use]
    pub const fn certain() -> Self {
        Self(Self::MAX_VALUE)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f32 {
        self.0
    }
}

// NaN is rejected at construction, so equality is total.
impl Eq for Certainty {}

impl Hash for Certainty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Default for Certainty {
    fn default() -> Self {
        Self::certain()
    }
}

impl fmt::Display for Certainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Certainty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = f32::deserialize(deserializer)?;
        Certainty::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Provenance of a stored fact: how sure we are, who said so, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Certainty assigned when the fact was asserted.
    pub certainty: Certainty,

    /// Free-form source label (agent, document, extractor).
    pub source: String,

    /// When the fact was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl Annotation {
    /// Creates an annotation recorded now.
    #[must_use]
    pub fn new(certainty: Certainty, source: impl Into<String>) -> Self {
        Self {
            certainty,
            source: source.into(),
            recorded_at: Utc::now(),
        }
    }

    /// Convenience constructor validating a raw certainty value.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::CertaintyOutOfRange` for invalid values.
    pub fn from_value(value: f32, source: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self::new(Certainty::new(value)?, source))
    }
}
