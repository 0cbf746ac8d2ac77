//! Value types shared across the weighbridge crates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier reported when nothing could be read from the snapshot
pub const SENTINEL_UNKNOWN: &str = "UNKNOWN";

/// Identifier reported when recognition failed and an operator has to look
pub const SENTINEL_MANUAL_CHECK: &str = "MANUAL_CHECK";

/// Whether an identifier is one of the reserved failure values
pub fn is_sentinel(identifier: &str) -> bool {
    identifier == SENTINEL_UNKNOWN || identifier == SENTINEL_MANUAL_CHECK
}

/// A single weight reading taken from the scale telemetry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    /// Weight in kg (sign as reported by the indicator)
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl WeightSample {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            observed_at: Utc::now(),
        }
    }
}

/// Result of the external vehicle identification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    /// License plate or sentinel value
    pub identifier: String,
    /// Recognizer confidence (0.0 - 1.0)
    pub confidence: f64,
    /// SHA-256 of the snapshot the identifier was read from
    #[serde(default)]
    pub snapshot_digest: Option<String>,
}

impl Identification {
    /// Build an identification, substituting `UNKNOWN` for a blank identifier
    pub fn new(identifier: impl Into<String>, confidence: f64) -> Self {
        let identifier = identifier.into();
        let identifier = if identifier.trim().is_empty() {
            SENTINEL_UNKNOWN.to_string()
        } else {
            identifier
        };
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            identifier,
            confidence,
            snapshot_digest: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(SENTINEL_UNKNOWN, 0.0)
    }

    pub fn manual_check() -> Self {
        Self::new(SENTINEL_MANUAL_CHECK, 0.0)
    }

    pub fn with_snapshot_digest(mut self, digest: String) -> Self {
        self.snapshot_digest = Some(digest);
        self
    }

    pub fn is_sentinel(&self) -> bool {
        is_sentinel(&self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_identifier_becomes_unknown() {
        let id = Identification::new("   ", 0.8);
        assert_eq!(id.identifier, SENTINEL_UNKNOWN);
        assert!(id.is_sentinel());
    }

    #[test]
    fn test_confidence_clamped() {
        assert!((Identification::new("ABC123", 1.7).confidence - 1.0).abs() < f64::EPSILON);
        assert!(Identification::new("ABC123", -0.2).confidence.abs() < f64::EPSILON);
        assert!(Identification::new("ABC123", f64::NAN).confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_sentinels() {
        assert!(is_sentinel("UNKNOWN"));
        assert!(is_sentinel("MANUAL_CHECK"));
        assert!(!is_sentinel("ABC123"));
        assert!(!is_sentinel("unknown"));
    }
}
