//! Error types for Motion Flux
//!
//! Policy outcomes (too slow, wrong direction, ...) are not errors; they are
//! returned as [`crate::validation::ValidationFailure`] values. The variants
//! here cover configuration mistakes, sequencing mistakes and input format
//! problems, all of which abort the call that hit them.

use thiserror::Error;

/// Errors that can occur while configuring or driving a component
#[derive(Debug, Error)]
pub enum MotionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{component} was used before {field} was initialized")]
    NotInitialized {
        component: &'static str,
        field: &'static str,
    },

    #[error("{component} received time={current} after it was previously called with time={previous}")]
    OutOfOrderTime {
        component: &'static str,
        previous: f64,
        current: f64,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid trajectory format: {0}")]
    BadFormat(String),

    #[error("Failed to parse value: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl MotionError {
    /// Shorthand for configuration errors raised by setters and constructors
    pub(crate) fn config(component: &str, message: impl std::fmt::Display) -> Self {
        MotionError::InvalidConfig(format!("{component}: {message}"))
    }

    /// True for errors caused by timestamps going backwards
    pub fn is_sequencing_error(&self) -> bool {
        matches!(self, MotionError::OutOfOrderTime { .. })
    }
}
