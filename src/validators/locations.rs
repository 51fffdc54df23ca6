//! Location validator
//!
//! Allows the pointer only on positions whose colour is valid. Either every
//! colour is valid except `invalid_colors`, or no colour is valid except
//! `valid_colors`, depending on `default_valid`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{default_enabled, Validator};
use crate::colormap::ColorLookup;
use crate::error::MotionError;
use crate::types::{ColorCode, ColorSpec};
use crate::validation::{FailureKind, Validation, ValidationFailure};

/// Construction parameters of a [`LocationsValidator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationsValidatorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub default_valid: bool,
    #[serde(default)]
    pub valid_colors: Vec<ColorSpec>,
    #[serde(default)]
    pub invalid_colors: Vec<ColorSpec>,
}

fn default_name() -> String {
    "locations".to_string()
}

impl Default for LocationsValidatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            enabled: true,
            default_valid: false,
            valid_colors: Vec::new(),
            invalid_colors: Vec::new(),
        }
    }
}

fn to_codes(colors: &[ColorSpec]) -> HashSet<ColorCode> {
    colors.iter().map(|c| c.to_code()).collect()
}

/// Validates the pointer position against a colour lookup
#[derive(Debug, Clone)]
pub struct LocationsValidator<L> {
    name: String,
    enabled: bool,
    default_valid: bool,
    valid_colors: HashSet<ColorCode>,
    invalid_colors: HashSet<ColorCode>,
    lookup: L,
}

impl<L: ColorLookup> LocationsValidator<L> {
    pub fn new(lookup: L, config: LocationsValidatorConfig) -> Self {
        Self {
            valid_colors: to_codes(&config.valid_colors),
            invalid_colors: to_codes(&config.invalid_colors),
            name: config.name,
            enabled: config.enabled,
            default_valid: config.default_valid,
            lookup,
        }
    }

    pub fn default_valid(&self) -> bool {
        self.default_valid
    }

    pub fn set_default_valid(&mut self, default_valid: bool) {
        self.default_valid = default_valid;
    }

    pub fn set_valid_colors(&mut self, colors: &[ColorSpec]) {
        self.valid_colors = to_codes(colors);
    }

    pub fn set_invalid_colors(&mut self, colors: &[ColorSpec]) {
        self.invalid_colors = to_codes(colors);
    }

    pub fn valid_colors(&self) -> &HashSet<ColorCode> {
        &self.valid_colors
    }

    pub fn invalid_colors(&self) -> &HashSet<ColorCode> {
        &self.invalid_colors
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Validate a position; time plays no role here
    pub fn check_xy(&self, x: f64, y: f64) -> Validation {
        if !self.enabled {
            return Ok(());
        }

        let color = self.lookup.color_at(x.round() as i32, y.round() as i32);
        let ok = match (self.default_valid, color) {
            (true, Some(c)) => !self.invalid_colors.contains(&c),
            (true, None) => true,
            (false, Some(c)) => self.valid_colors.contains(&c),
            (false, None) => false,
        };
        if ok {
            return Ok(());
        }

        debug!(validator = %self.name, x, y, ?color, "location validation failed");
        Err(ValidationFailure::new(
            FailureKind::InvalidLocation,
            self.name.clone(),
            "You moved to an invalid location",
        )
        .with_detail("color", color.map_or(Value::Null, Value::from)))
    }
}

impl<L: ColorLookup> Validator for LocationsValidator<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn reset(&mut self, _time0: Option<f64>) {}

    fn check_xyt(&mut self, x: f64, y: f64, _t: f64) -> Result<Validation, MotionError> {
        Ok(self.check_xy(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::{ColorMapping, LocationColorMap};
    use crate::types::Rgb;

    const WHITE: Rgb = Rgb(255, 255, 255);
    const BLACK: Rgb = Rgb(0, 0, 0);

    /// 3x1 strip: white, black, white, centred on (1, 0)
    fn strip() -> LocationColorMap {
        LocationColorMap::new(vec![vec![WHITE, BLACK, WHITE]], (1, 0), ColorMapping::Rgb).unwrap()
    }

    #[test]
    fn test_valid_colors_whitelist() {
        let mut v = LocationsValidator::new(
            strip(),
            LocationsValidatorConfig {
                valid_colors: vec![ColorSpec::Rgb(WHITE)],
                ..Default::default()
            },
        );

        assert!(v.check_xyt(0.0, 0.0, 0.0).unwrap().is_ok());
        assert!(v.check_xyt(2.2, 0.3, 0.0).unwrap().is_ok());

        let failure = v.check_xyt(1.0, 0.0, 0.0).unwrap().unwrap_err();
        assert_eq!(failure.kind, FailureKind::InvalidLocation);
        assert_eq!(failure.details["color"], 0);

        // outside the image nothing is whitelisted
        let failure = v.check_xyt(10.0, 0.0, 0.0).unwrap().unwrap_err();
        assert_eq!(failure.details["color"], Value::Null);
    }

    #[test]
    fn test_invalid_colors_blacklist() {
        let v = LocationsValidator::new(
            strip(),
            LocationsValidatorConfig {
                default_valid: true,
                invalid_colors: vec![ColorSpec::Code(0)],
                ..Default::default()
            },
        );

        assert!(v.check_xy(0.0, 0.0).is_ok());
        assert!(v.check_xy(1.4, 0.0).is_err());
        assert!(v.check_xy(50.0, 50.0).is_ok());
    }

    #[test]
    fn test_disabled_passes() {
        let mut v = LocationsValidator::new(
            strip(),
            LocationsValidatorConfig {
                enabled: false,
                ..Default::default()
            },
        );
        assert!(v.check_xyt(1.0, 0.0, 0.0).unwrap().is_ok());
        v.set_enabled(true);
        assert!(v.check_xyt(1.0, 0.0, 0.0).unwrap().is_err());
    }
}
