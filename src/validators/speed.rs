//! Instantaneous speed validator

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{default_enabled, validate_grace_period, validate_positive_bound, Validator};
use crate::error::MotionError;
use crate::monitor::MovementMonitor;
use crate::types::Axis;
use crate::validation::{FailureKind, Validation, ValidationFailure};
use crate::window::WindowSpan;

const COMPONENT: &str = "SpeedValidator";

/// Construction parameters of a [`SpeedValidator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedValidatorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub axis: Axis,
    /// mm/sec; `None` disables the lower bound
    #[serde(default)]
    pub min_speed: Option<f64>,
    /// mm/sec; `None` disables the upper bound
    #[serde(default)]
    pub max_speed: Option<f64>,
    #[serde(default)]
    pub grace_period: f64,
    /// Minimal time (seconds) over which speed is computed
    #[serde(default)]
    pub calc_speed_interval: f64,
}

fn default_name() -> String {
    "speed".to_string()
}

impl Default for SpeedValidatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            enabled: true,
            axis: Axis::default(),
            min_speed: None,
            max_speed: None,
            grace_period: 0.0,
            calc_speed_interval: 0.0,
        }
    }
}

impl SpeedValidatorConfig {
    pub fn validate(&self) -> Result<(), MotionError> {
        validate_positive_bound(COMPONENT, "min_speed", self.min_speed)?;
        validate_positive_bound(COMPONENT, "max_speed", self.max_speed)?;
        validate_grace_period(COMPONENT, self.grace_period)?;
        if !self.calc_speed_interval.is_finite() || self.calc_speed_interval < 0.0 {
            return Err(MotionError::config(
                COMPONENT,
                format!(
                    "calc_speed_interval must be non-negative, got {}",
                    self.calc_speed_interval
                ),
            ));
        }
        Ok(())
    }
}

/// Checks that the instantaneous speed stays within `[min_speed, max_speed]`
#[derive(Debug, Clone)]
pub struct SpeedValidator {
    config: SpeedValidatorConfig,
    monitor: MovementMonitor,
}

impl SpeedValidator {
    pub fn new(units_per_mm: f64, config: SpeedValidatorConfig) -> Result<Self, MotionError> {
        config.validate()?;
        let monitor = MovementMonitor::new(
            units_per_mm,
            WindowSpan::Duration(config.calc_speed_interval),
        )?;
        Ok(Self { config, monitor })
    }

    pub fn config(&self) -> &SpeedValidatorConfig {
        &self.config
    }

    pub fn set_min_speed(&mut self, min_speed: Option<f64>) -> Result<(), MotionError> {
        validate_positive_bound(COMPONENT, "min_speed", min_speed)?;
        self.config.min_speed = min_speed;
        Ok(())
    }

    pub fn set_max_speed(&mut self, max_speed: Option<f64>) -> Result<(), MotionError> {
        validate_positive_bound(COMPONENT, "max_speed", max_speed)?;
        self.config.max_speed = max_speed;
        Ok(())
    }

    pub fn set_grace_period(&mut self, grace_period: f64) -> Result<(), MotionError> {
        validate_grace_period(COMPONENT, grace_period)?;
        self.config.grace_period = grace_period;
        Ok(())
    }

    /// The underlying monitor (speed readings in mm/sec)
    pub fn monitor(&self) -> &MovementMonitor {
        &self.monitor
    }

    fn failure(&self, kind: FailureKind, message: &str, speed: f64) -> ValidationFailure {
        debug!(validator = %self.config.name, speed, kind = %kind, "speed validation failed");
        ValidationFailure::new(kind, self.config.name.clone(), message)
            .with_detail("speed", speed)
            .with_detail("axis", self.config.axis.as_str())
    }
}

impl Validator for SpeedValidator {
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

        self.monitor.update_xyt(x, y, t)?;

        let in_grace = self
            .monitor
            .elapsed_trial_time()
            .map_or(true, |elapsed| elapsed <= self.config.grace_period);
        if in_grace {
            return Ok(Ok(()));
        }

        let Some(speed) = self.monitor.speed(self.config.axis) else {
            return Ok(Ok(()));
        };

        if let Some(min_speed) = self.config.min_speed {
            if speed < min_speed {
                return Ok(Err(self.failure(FailureKind::TooSlow, "You moved too slowly", speed)));
            }
        }
        if let Some(max_speed) = self.config.max_speed {
            if speed > max_speed {
                return Ok(Err(self.failure(FailureKind::TooFast, "You moved too fast", speed)));
            }
        }

        Ok(Ok(()))
    }
}
