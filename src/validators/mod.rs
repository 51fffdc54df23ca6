//! Movement validators
//!
//! Each validator wraps its own monitor/state and turns every new pointer
//! sample into a [`Validation`]. Configuration mistakes and out-of-order
//! timestamps are reported as [`MotionError`]s instead.

mod direction;
mod global_speed;
mod gradient;
mod locations;
mod speed;

pub use direction::{DirectionValidator, DirectionValidatorConfig};
pub use global_speed::{
    GlobalSpeedValidator, GlobalSpeedValidatorConfig, GuideMode, GuideReading, Section,
};
pub use gradient::{GradientDirection, GradientValidator, GradientValidatorConfig};
pub use locations::{LocationsValidator, LocationsValidatorConfig};
pub use speed::{SpeedValidator, SpeedValidatorConfig};

use crate::error::MotionError;
use crate::validation::Validation;

/// Common interface of all per-sample validators
pub trait Validator {
    /// Instance name, copied into every failure this validator produces
    fn name(&self) -> &str;

    /// A disabled validator passes every sample without recording it
    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Start a new trial; `time0` becomes the zero point of elapsed time when given
    fn reset(&mut self, time0: Option<f64>);

    /// Validate the pointer being at `(x, y)` at time `t`
    fn check_xyt(&mut self, x: f64, y: f64, t: f64) -> Result<Validation, MotionError>;
}

impl<V: Validator + ?Sized> Validator for Box<V> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn set_enabled(&mut self, enabled: bool) {
        (**self).set_enabled(enabled)
    }

    fn reset(&mut self, time0: Option<f64>) {
        (**self).reset(time0)
    }

    fn check_xyt(&mut self, x: f64, y: f64, t: f64) -> Result<Validation, MotionError> {
        (**self).check_xyt(x, y, t)
    }
}

pub(crate) fn default_enabled() -> bool {
    true
}

pub(crate) fn validate_grace_period(component: &str, grace_period: f64) -> Result<(), MotionError> {
    if !grace_period.is_finite() || grace_period < 0.0 {
        return Err(MotionError::config(
            component,
            format!("grace_period must be non-negative, got {grace_period}"),
        ));
    }
    Ok(())
}

/// Optional bound that, when present, must be strictly positive
pub(crate) fn validate_positive_bound(
    component: &str,
    field: &str,
    value: Option<f64>,
) -> Result<(), MotionError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(MotionError::config(
            component,
            format!("{field} must be positive, got {v}"),
        )),
        _ => Ok(()),
    }
}
