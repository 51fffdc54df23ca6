//! Move-by-gradient validator
//!
//! The colour code under the pointer must change monotonically in the
//! configured direction. Small moves backwards are tolerated up to
//! `max_valid_back_movement`, and `last_validated_rgb` allows a cyclic ramp to
//! wrap around once the pointer has passed that colour.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{default_enabled, Validator};
use crate::colormap::ColorLookup;
use crate::error::MotionError;
use crate::types::{ColorCode, ColorSpec};
use crate::validation::{FailureKind, Validation, ValidationFailure};

const COMPONENT: &str = "GradientValidator";

/// Required direction of colour change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDirection {
    #[default]
    Ascending,
    Descending,
}

impl GradientDirection {
    fn sign(&self) -> i64 {
        match self {
            GradientDirection::Ascending => 1,
            GradientDirection::Descending => -1,
        }
    }
}

/// Construction parameters of a [`GradientValidator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientValidatorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub direction: GradientDirection,
    #[serde(default)]
    pub max_valid_back_movement: f64,
    #[serde(default)]
    pub last_validated_rgb: Option<ColorSpec>,
}

fn default_name() -> String {
    "gradient".to_string()
}

impl Default for GradientValidatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            enabled: true,
            direction: GradientDirection::default(),
            max_valid_back_movement: 0.0,
            last_validated_rgb: None,
        }
    }
}

fn validate_back_movement(value: f64) -> Result<(), MotionError> {
    if !value.is_finite() || value < 0.0 {
        return Err(MotionError::config(
            COMPONENT,
            format!("max_valid_back_movement must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

/// Validates that the pointer follows a colour gradient
#[derive(Debug, Clone)]
pub struct GradientValidator<L> {
    name: String,
    enabled: bool,
    direction: GradientDirection,
    max_valid_back_movement: f64,
    last_validated_rgb: Option<ColorCode>,
    lookup: L,
    last_color: Option<ColorCode>,
}

impl<L: ColorLookup> GradientValidator<L> {
    pub fn new(lookup: L, config: GradientValidatorConfig) -> Result<Self, MotionError> {
        validate_back_movement(config.max_valid_back_movement)?;
        Ok(Self {
            name: config.name,
            enabled: config.enabled,
            direction: config.direction,
            max_valid_back_movement: config.max_valid_back_movement,
            last_validated_rgb: config.last_validated_rgb.map(ColorSpec::to_code),
            lookup,
            last_color: None,
        })
    }

    pub fn direction(&self) -> GradientDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: GradientDirection) {
        self.direction = direction;
    }

    pub fn set_max_valid_back_movement(&mut self, value: f64) -> Result<(), MotionError> {
        validate_back_movement(value)?;
        self.max_valid_back_movement = value;
        Ok(())
    }

    pub fn set_last_validated_rgb(&mut self, color: Option<ColorSpec>) {
        self.last_validated_rgb = color.map(ColorSpec::to_code);
    }

    /// Colour the next sample is compared against
    pub fn last_color(&self) -> Option<ColorCode> {
        self.last_color
    }

    /// Whether the remembered colour has already crossed `last_validated_rgb`
    fn crossed_last_validated(&self, last_color: ColorCode) -> bool {
        match (self.last_validated_rgb, self.direction) {
            (Some(limit), GradientDirection::Ascending) => last_color > limit,
            (Some(limit), GradientDirection::Descending) => last_color < limit,
            (None, _) => false,
        }
    }

    pub fn check_xy(&mut self, x: f64, y: f64) -> Validation {
        if !self.enabled {
            return Ok(());
        }

        let Some(color) = self.lookup.color_at(x.round() as i32, y.round() as i32) else {
            // outside the map: cannot be validated
            return Ok(());
        };
        let Some(last_color) = self.last_color else {
            self.last_color = Some(color);
            return Ok(());
        };

        let delta = (color as i64 - last_color as i64) * self.direction.sign();
        if delta >= 0 {
            self.last_color = Some(color);
            return Ok(());
        }
        if delta as f64 >= -self.max_valid_back_movement {
            return Ok(());
        }
        if self.crossed_last_validated(last_color) {
            return Ok(());
        }

        debug!(validator = %self.name, color, last_color, "gradient validation failed");
        Err(ValidationFailure::new(
            FailureKind::GradientViolation,
            self.name.clone(),
            "You moved in an invalid direction",
        )
        .with_detail("color", color)
        .with_detail("last_color", last_color))
    }
}

impl<L: ColorLookup> Validator for GradientValidator<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn reset(&mut self, _time0: Option<f64>) {
        self.last_color = None;
    }

    fn check_xyt(&mut self, x: f64, y: f64, _t: f64) -> Result<Validation, MotionError> {
        Ok(self.check_xy(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::LookupFn;

    /// Colour code equals x for 0 <= x < 100
    fn ramp() -> LookupFn<impl Fn(i32, i32) -> Option<ColorCode>> {
        LookupFn(|x: i32, _y: i32| if (0..100).contains(&x) { Some(x as ColorCode) } else { None })
    }

    fn validator(config: GradientValidatorConfig) -> GradientValidator<LookupFn<impl Fn(i32, i32) -> Option<ColorCode>>> {
        GradientValidator::new(ramp(), config).unwrap()
    }

    #[test]
    fn test_rejects_negative_back_movement() {
        let config = GradientValidatorConfig {
            max_valid_back_movement: -1.0,
            ..Default::default()
        };
        assert!(GradientValidator::new(ramp(), config).is_err());
    }

    #[test]
    fn test_ascending_with_regression() {
        let mut v = validator(GradientValidatorConfig::default());
        assert!(v.check_xy(0.0, 0.0).is_ok());
        assert!(v.check_xy(10.0, 0.0).is_ok());
        assert!(v.check_xy(10.0, 5.0).is_ok());

        let failure = v.check_xy(9.0, 0.0).unwrap_err();
        assert_eq!(failure.kind, FailureKind::GradientViolation);
        assert_eq!(failure.details["color"], 9);
    }

    #[test]
    fn test_back_movement_tolerance_keeps_reference() {
        let mut v = validator(GradientValidatorConfig {
            max_valid_back_movement: 3.0,
            ..Default::default()
        });
        v.check_xy(20.0, 0.0).unwrap();
        assert!(v.check_xy(17.0, 0.0).is_ok());
        assert_eq!(v.last_color(), Some(20));
        assert!(v.check_xy(16.0, 0.0).is_err());
    }

    #[test]
    fn test_descending() {
        let mut v = validator(GradientValidatorConfig {
            direction: GradientDirection::Descending,
            ..Default::default()
        });
        v.check_xy(50.0, 0.0).unwrap();
        assert!(v.check_xy(40.0, 0.0).is_ok());
        assert!(v.check_xy(41.0, 0.0).is_err());
    }

    #[test]
    fn test_cyclic_ramp_wraps_after_last_validated() {
        let mut v = validator(GradientValidatorConfig {
            last_validated_rgb: Some(ColorSpec::Code(90)),
            ..Default::default()
        });
        v.check_xy(80.0, 0.0).unwrap();
        assert!(v.check_xy(5.0, 0.0).is_err());

        v.check_xy(95.0, 0.0).unwrap();
        assert!(v.check_xy(5.0, 0.0).is_ok());
    }

    #[test]
    fn test_outside_map_and_reset() {
        let mut v = validator(GradientValidatorConfig::default());
        v.check_xy(50.0, 0.0).unwrap();
        assert!(v.check_xy(500.0, 0.0).is_ok());
        assert_eq!(v.last_color(), Some(50));

        v.reset(None);
        assert_eq!(v.last_color(), None);
        assert!(v.check_xy(10.0, 0.0).is_ok());
        assert_eq!(v.last_color(), Some(10));
    }
}
