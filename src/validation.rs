//! Validation outcomes
//!
//! A validator either passes (`Ok(())`) or returns a [`ValidationFailure`]
//! describing which policy was violated. This is the only representation of
//! "pass" used anywhere in the crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Result of validating one sample
pub type Validation = Result<(), ValidationFailure>;

/// Category of a policy violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TooSlow,
    TooFast,
    InvalidDirection,
    InvalidLocation,
    GradientViolation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TooSlow => "too_slow",
            FailureKind::TooFast => "too_fast",
            FailureKind::InvalidDirection => "invalid_direction",
            FailureKind::InvalidLocation => "invalid_location",
            FailureKind::GradientViolation => "gradient_violation",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed policy failure with a kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Name of the validator instance that produced the failure
    pub validator: String,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl ValidationFailure {
    pub fn new(kind: FailureKind, validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            validator: validator.into(),
            details: BTreeMap::new(),
        }
    }

    /// Attach a payload entry
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Numeric payload entry, if present
    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.validator, self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failure_serialization() {
        let failure = ValidationFailure::new(FailureKind::TooSlow, "speed", "too slow")
            .with_detail("speed", 0.9);

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "too_slow");
        assert_eq!(json["validator"], "speed");
        assert_eq!(json["details"]["speed"], 0.9);
        assert_eq!(failure.detail_f64("speed"), Some(0.9));
        assert_eq!(failure.detail_f64("angle"), None);
    }

    #[test]
    fn test_failure_display() {
        let failure = ValidationFailure::new(FailureKind::InvalidDirection, "dir", "bad angle");
        assert_eq!(failure.to_string(), "[dir] invalid_direction: bad angle");
    }
}
