//! Movement direction validator
//!
//! Bounds are in degrees, 0 = up, clockwise. `min_angle > max_angle` is valid:
//! the allowed arc then wraps through 0 and the invalid zone is `(max, min)`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{default_enabled, validate_grace_period, Validator};
use crate::error::MotionError;
use crate::geometry::{angle_in_range, normalize_angle};
use crate::monitor::MovementMonitor;
use crate::validation::{FailureKind, Validation, ValidationFailure};
use crate::window::WindowSpan;

const COMPONENT: &str = "DirectionValidator";

/// Construction parameters of a [`DirectionValidator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionValidatorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub min_angle: Option<f64>,
    #[serde(default)]
    pub max_angle: Option<f64>,
    /// Minimal distance (mm) over which the direction is computed
    #[serde(default)]
    pub calc_angle_interval: f64,
    #[serde(default)]
    pub grace_period: f64,
}

fn default_name() -> String {
    "direction".to_string()
}

impl Default for DirectionValidatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            enabled: true,
            min_angle: None,
            max_angle: None,
            calc_angle_interval: 0.0,
            grace_period: 0.0,
        }
    }
}

impl DirectionValidatorConfig {
    pub fn validate(&self) -> Result<(), MotionError> {
        for (field, value) in [("min_angle", self.min_angle), ("max_angle", self.max_angle)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(MotionError::config(
                        COMPONENT,
                        format!("{field} must be a finite number, got {v}"),
                    ));
                }
            }
        }
        if !self.calc_angle_interval.is_finite() || self.calc_angle_interval < 0.0 {
            return Err(MotionError::config(
                COMPONENT,
                format!(
                    "calc_angle_interval must be non-negative, got {}",
                    self.calc_angle_interval
                ),
            ));
        }
        validate_grace_period(COMPONENT, self.grace_period)
    }
}

/// Checks that the movement direction lies within `[min_angle, max_angle]`
#[derive(Debug, Clone)]
pub struct DirectionValidator {
    config: DirectionValidatorConfig,
    monitor: MovementMonitor,
}

impl DirectionValidator {
    pub fn new(units_per_mm: f64, mut config: DirectionValidatorConfig) -> Result<Self, MotionError> {
        config.validate()?;
        config.min_angle = config.min_angle.map(|a| normalize_angle(a, 360.0));
        config.max_angle = config.max_angle.map(|a| normalize_angle(a, 360.0));

        let monitor = MovementMonitor::new(
            units_per_mm,
            WindowSpan::Distance(config.calc_angle_interval),
        )?;
        Ok(Self { config, monitor })
    }

    pub fn config(&self) -> &DirectionValidatorConfig {
        &self.config
    }

    /// Set both bounds (degrees); each is normalised into `[0, 360)`
    pub fn set_angle_range(
        &mut self,
        min_angle: Option<f64>,
        max_angle: Option<f64>,
    ) -> Result<(), MotionError> {
        let candidate = DirectionValidatorConfig {
            min_angle,
            max_angle,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.config.min_angle = min_angle.map(|a| normalize_angle(a, 360.0));
        self.config.max_angle = max_angle.map(|a| normalize_angle(a, 360.0));
        Ok(())
    }

    pub fn set_grace_period(&mut self, grace_period: f64) -> Result<(), MotionError> {
        validate_grace_period(COMPONENT, grace_period)?;
        self.config.grace_period = grace_period;
        Ok(())
    }

    /// Bounds that actually constrain: both set and distinct
    fn active_range(&self) -> Option<(f64, f64)> {
        match (self.config.min_angle, self.config.max_angle) {
            (Some(min), Some(max)) if min != max => Some((min, max)),
            _ => None,
        }
    }
}

impl Validator for DirectionValidator {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn reset(&mut self, time0: Option<f64>) {
        self.monitor.reset(time0);
    }

    fn check_xyt(&mut self, x: f64, y: f64, t: f64) -> Result<Validation, MotionError> {
        if !self.config.enabled {
            return Ok(Ok(()));
        }
        let Some((min, max)) = self.active_range() else {
            return Ok(Ok(()));
        };

        self.monitor.update_xyt(x, y, t)?;

        let in_grace = self
            .monitor
            .elapsed_trial_time()
            .map_or(true, |elapsed| elapsed <= self.config.grace_period);
        if in_grace {
            return Ok(Ok(()));
        }

        let Some(degrees) = self.monitor.angle_degrees() else {
            return Ok(Ok(()));
        };
        let angle = normalize_angle(degrees, 360.0);

        if angle_in_range(angle, min, max) {
            return Ok(Ok(()));
        }

        debug!(validator = %self.config.name, angle, min, max, "direction validation failed");
        Ok(Err(ValidationFailure::new(
            FailureKind::InvalidDirection,
            self.config.name.clone(),
            "You moved in an incorrect direction",
        )
        .with_detail("angle", angle)))
    }
}
