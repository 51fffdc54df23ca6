//! Trial configuration
//!
//! A single JSON document describes every component of a trial. All
//! configuration errors are reported by [`TrialConfig::validate`] (and by the
//! builders), before the first sample is processed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::colormap::{ColorMapping, LocationColorMap};
use crate::curves::CurveDetector;
use crate::error::MotionError;
use crate::monitor::validate_units_per_mm;
use crate::types::{AngleUnits, Rgb};
use crate::validators::{
    DirectionValidator, DirectionValidatorConfig, GlobalSpeedValidator,
    GlobalSpeedValidatorConfig, GradientValidator, GradientValidatorConfig, LocationsValidator,
    LocationsValidatorConfig, SpeedValidator, SpeedValidatorConfig, Validator,
};

const COMPONENT: &str = "TrialConfig";

/// Parameters of the [`CurveDetector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    /// Minimal displacement (mm) over which the movement angle is computed
    #[serde(default)]
    pub min_distance_mm: f64,
    #[serde(default)]
    pub angle_units: AngleUnits,
    #[serde(default)]
    pub zero_angle: f64,
    #[serde(default = "default_min_angle_change")]
    pub min_angle_change_per_curve: f64,
}

fn default_min_angle_change() -> f64 {
    90.0
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            min_distance_mm: 0.0,
            angle_units: AngleUnits::default(),
            zero_angle: 0.0,
            min_angle_change_per_curve: default_min_angle_change(),
        }
    }
}

/// Colour image placed on the plane, shared by the spatial validators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMapConfig {
    /// `image[row][col]`; row 0 holds the smallest y coordinate
    pub image: Vec<Vec<Rgb>>,
    #[serde(default)]
    pub position: (i32, i32),
    #[serde(default)]
    pub indexed: bool,
}

impl ColorMapConfig {
    pub fn build(&self) -> Result<LocationColorMap, MotionError> {
        let mapping = if self.indexed {
            ColorMapping::Indexed
        } else {
            ColorMapping::Rgb
        };
        LocationColorMap::new(self.image.clone(), self.position, mapping)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationsConfig {
    pub map: ColorMapConfig,
    #[serde(flatten)]
    pub validator: LocationsValidatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientConfig {
    pub map: ColorMapConfig,
    #[serde(flatten)]
    pub validator: GradientValidatorConfig,
}

fn default_units_per_mm() -> f64 {
    1.0
}

/// Complete description of one trial's monitoring setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Coordinate units per millimetre; must be positive
    #[serde(default = "default_units_per_mm")]
    pub units_per_mm: f64,
    /// Zero point of elapsed time; the first sample when absent
    #[serde(default)]
    pub start_time: Option<f64>,
    /// Record the pointer path of the trial
    #[serde(default)]
    pub track_trajectory: bool,
    #[serde(default)]
    pub speed: Option<SpeedValidatorConfig>,
    #[serde(default)]
    pub direction: Option<DirectionValidatorConfig>,
    #[serde(default)]
    pub global_speed: Option<GlobalSpeedValidatorConfig>,
    #[serde(default)]
    pub locations: Option<LocationsConfig>,
    #[serde(default)]
    pub gradient: Option<GradientConfig>,
    #[serde(default)]
    pub curves: Option<CurveConfig>,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            units_per_mm: default_units_per_mm(),
            start_time: None,
            track_trajectory: false,
            speed: None,
            direction: None,
            global_speed: None,
            locations: None,
            gradient: None,
            curves: None,
        }
    }
}

impl TrialConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, MotionError> {
        let config: TrialConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every block by building it once
    pub fn validate(&self) -> Result<(), MotionError> {
        validate_units_per_mm(COMPONENT, self.units_per_mm)?;
        if let Some(t0) = self.start_time {
            if !t0.is_finite() {
                return Err(MotionError::config(COMPONENT, "start_time must be a finite number"));
            }
        }
        self.build_validators()?;
        self.build_curve_detector()?;
        Ok(())
    }

    /// Validators in a fixed order: speed, direction, global speed, locations, gradient
    pub fn build_validators(&self) -> Result<Vec<Box<dyn Validator>>, MotionError> {
        let mut validators: Vec<Box<dyn Validator>> = Vec::new();

        if let Some(speed) = &self.speed {
            validators.push(Box::new(SpeedValidator::new(self.units_per_mm, speed.clone())?));
        }
        if let Some(direction) = &self.direction {
            validators.push(Box::new(DirectionValidator::new(
                self.units_per_mm,
                direction.clone(),
            )?));
        }
        if let Some(global) = &self.global_speed {
            global.validate_complete()?;
            validators.push(Box::new(GlobalSpeedValidator::new(global.clone())?));
        }
        if let Some(locations) = &self.locations {
            // allowed and forbidden colours are 24-bit RGB codes
            if locations.map.indexed {
                return Err(MotionError::config(
                    COMPONENT,
                    "the locations map cannot be indexed, its colours are matched as RGB",
                ));
            }
            let map = Arc::new(locations.map.build()?);
            validators.push(Box::new(LocationsValidator::new(
                map,
                locations.validator.clone(),
            )));
        }
        if let Some(gradient) = &self.gradient {
            let map = Arc::new(gradient.map.build()?);
            validators.push(Box::new(GradientValidator::new(
                map,
                gradient.validator.clone(),
            )?));
        }

        Ok(validators)
    }

    pub fn build_curve_detector(&self) -> Result<Option<CurveDetector>, MotionError> {
        self.curves
            .as_ref()
            .map(|c| {
                CurveDetector::new(
                    self.units_per_mm,
                    c.min_distance_mm,
                    c.angle_units,
                    c.zero_angle,
                    c.min_angle_change_per_curve,
                )
            })
            .transpose()
    }
}
