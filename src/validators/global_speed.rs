//! Global (average) speed validator
//!
//! Validates cumulative progress along one axis against a piecewise-linear
//! time/distance profile: by any point in the trial the pointer must have
//! reached the coordinate the profile expects at that time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{default_enabled, validate_grace_period, Validator};
use crate::error::MotionError;
use crate::types::Axis;
use crate::validation::{FailureKind, Validation, ValidationFailure};

const COMPONENT: &str = "GlobalSpeedValidator";
const FRACTION_TOLERANCE: f64 = 1e-6;

/// One segment of the speed profile, as fractions of the whole trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub time_fraction: f64,
    pub distance_fraction: f64,
}

impl Section {
    pub fn new(time_fraction: f64, distance_fraction: f64) -> Self {
        Self {
            time_fraction,
            distance_fraction,
        }
    }
}

fn default_sections() -> Vec<Section> {
    vec![Section::new(1.0, 1.0)]
}

/// Check fractions are in (0, 1] and sum to 1 in both dimensions
pub fn validate_sections(sections: &[Section]) -> Result<(), MotionError> {
    if sections.is_empty() {
        return Err(MotionError::config(COMPONENT, "at least one section is required"));
    }

    let mut total_time = 0.0;
    let mut total_distance = 0.0;
    for (i, section) in sections.iter().enumerate() {
        for (field, value) in [
            ("time_fraction", section.time_fraction),
            ("distance_fraction", section.distance_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(MotionError::config(
                    COMPONENT,
                    format!("sections[{i}].{field} must be in (0, 1], got {value}"),
                ));
            }
        }

        total_time += section.time_fraction;
        total_distance += section.distance_fraction;
        if total_time > 1.0 + FRACTION_TOLERANCE {
            return Err(MotionError::config(
                COMPONENT,
                format!("the time fractions exceed 1.0 at sections[{i}]"),
            ));
        }
        if total_distance > 1.0 + FRACTION_TOLERANCE {
            return Err(MotionError::config(
                COMPONENT,
                format!("the distance fractions exceed 1.0 at sections[{i}]"),
            ));
        }
    }

    if (total_time - 1.0).abs() > FRACTION_TOLERANCE {
        return Err(MotionError::config(
            COMPONENT,
            format!("the time fractions sum to {total_time} rather than to 1.0"),
        ));
    }
    if (total_distance - 1.0).abs() > FRACTION_TOLERANCE {
        return Err(MotionError::config(
            COMPONENT,
            format!("the distance fractions sum to {total_distance} rather than to 1.0"),
        ));
    }
    Ok(())
}

/// How the speed guide would be drawn for the last sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideMode {
    /// Still within the grace period
    Grace,
    /// The pointer is ahead of where it must be `guide_warning_time_delta` from now
    Ok,
    /// The pointer is about to fall behind the profile
    Error,
}

/// Position and state of the speed guide after the last validated sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideReading {
    pub expected_coord: f64,
    pub mode: GuideMode,
}

/// Construction parameters of a [`GlobalSpeedValidator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSpeedValidatorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub origin_coord: Option<f64>,
    #[serde(default)]
    pub end_coord: Option<f64>,
    #[serde(default)]
    pub axis: Axis,
    /// Seconds allowed to get from origin to end
    #[serde(default)]
    pub max_trial_duration: Option<f64>,
    #[serde(default)]
    pub grace_period: f64,
    #[serde(default = "default_sections")]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub guide_warning_time_delta: f64,
}

fn default_name() -> String {
    "global_speed".to_string()
}

impl Default for GlobalSpeedValidatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            enabled: true,
            origin_coord: None,
            end_coord: None,
            axis: Axis::default(),
            max_trial_duration: None,
            grace_period: 0.0,
            sections: default_sections(),
            guide_warning_time_delta: 0.0,
        }
    }
}

impl GlobalSpeedValidatorConfig {
    /// Checks every field that is set. Missing coordinates and duration are
    /// allowed here and only reported when a sample is validated.
    pub fn validate(&self) -> Result<(), MotionError> {
        validate_axis(self.axis)?;
        for (field, value) in [("origin_coord", self.origin_coord), ("end_coord", self.end_coord)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(MotionError::config(
                        COMPONENT,
                        format!("{field} must be a finite number, got {v}"),
                    ));
                }
            }
        }
        if let Some(duration) = self.max_trial_duration {
            validate_duration(duration)?;
        }
        validate_grace_period(COMPONENT, self.grace_period)?;
        validate_sections(&self.sections)?;
        if !self.guide_warning_time_delta.is_finite() || self.guide_warning_time_delta < 0.0 {
            return Err(MotionError::config(
                COMPONENT,
                format!(
                    "guide_warning_time_delta must be non-negative, got {}",
                    self.guide_warning_time_delta
                ),
            ));
        }
        Ok(())
    }

    /// Stricter check for configurations loaded in one piece: an enabled
    /// validator must also carry its coordinates and duration.
    pub fn validate_complete(&self) -> Result<(), MotionError> {
        self.validate()?;
        if !self.enabled {
            return Ok(());
        }
        for (field, missing) in [
            ("origin_coord", self.origin_coord.is_none()),
            ("end_coord", self.end_coord.is_none()),
            ("max_trial_duration", self.max_trial_duration.is_none()),
        ] {
            if missing {
                return Err(MotionError::config(COMPONENT, format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// Sign of a progress delta, 0 for no movement at all
fn progress_sign(delta: f64) -> f64 {
    if delta == 0.0 {
        0.0
    } else {
        delta.signum()
    }
}

fn validate_axis(axis: Axis) -> Result<(), MotionError> {
    if axis == Axis::XY {
        return Err(MotionError::config(COMPONENT, "axis must be x or y"));
    }
    Ok(())
}

fn validate_duration(duration: f64) -> Result<(), MotionError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MotionError::config(
            COMPONENT,
            format!("max_trial_duration must be positive, got {duration}"),
        ));
    }
    Ok(())
}

/// Fully initialised profile parameters
#[derive(Debug, Clone, Copy)]
struct Profile {
    origin: f64,
    end: f64,
    duration: f64,
}

/// Validates progress against the section-based speed profile
#[derive(Debug, Clone)]
pub struct GlobalSpeedValidator {
    config: GlobalSpeedValidatorConfig,
    time0: Option<f64>,
    guide: Option<GuideReading>,
}

impl GlobalSpeedValidator {
    pub fn new(config: GlobalSpeedValidatorConfig) -> Result<Self, MotionError> {
        config.validate()?;
        Ok(Self {
            config,
            time0: None,
            guide: None,
        })
    }

    pub fn config(&self) -> &GlobalSpeedValidatorConfig {
        &self.config
    }

    pub fn set_origin_coord(&mut self, origin_coord: f64) -> Result<(), MotionError> {
        if !origin_coord.is_finite() {
            return Err(MotionError::config(COMPONENT, "origin_coord must be a finite number"));
        }
        self.config.origin_coord = Some(origin_coord);
        Ok(())
    }

    pub fn set_end_coord(&mut self, end_coord: f64) -> Result<(), MotionError> {
        if !end_coord.is_finite() {
            return Err(MotionError::config(COMPONENT, "end_coord must be a finite number"));
        }
        self.config.end_coord = Some(end_coord);
        Ok(())
    }

    pub fn set_axis(&mut self, axis: Axis) -> Result<(), MotionError> {
        validate_axis(axis)?;
        self.config.axis = axis;
        Ok(())
    }

    pub fn set_max_trial_duration(&mut self, duration: f64) -> Result<(), MotionError> {
        validate_duration(duration)?;
        self.config.max_trial_duration = Some(duration);
        Ok(())
    }

    pub fn set_sections(&mut self, sections: Vec<Section>) -> Result<(), MotionError> {
        validate_sections(&sections)?;
        self.config.sections = sections;
        Ok(())
    }

    pub fn set_grace_period(&mut self, grace_period: f64) -> Result<(), MotionError> {
        validate_grace_period(COMPONENT, grace_period)?;
        self.config.grace_period = grace_period;
        Ok(())
    }

    pub fn set_guide_warning_time_delta(&mut self, delta: f64) -> Result<(), MotionError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(MotionError::config(
                COMPONENT,
                format!("guide_warning_time_delta must be non-negative, got {delta}"),
            ));
        }
        self.config.guide_warning_time_delta = delta;
        Ok(())
    }

    /// Guide state computed for the last sample, if any
    pub fn guide(&self) -> Option<GuideReading> {
        self.guide
    }

    fn profile(&self) -> Result<Profile, MotionError> {
        let missing = |field| MotionError::NotInitialized {
            component: COMPONENT,
            field,
        };
        Ok(Profile {
            origin: self.config.origin_coord.ok_or_else(|| missing("origin_coord"))?,
            end: self.config.end_coord.ok_or_else(|| missing("end_coord"))?,
            duration: self
                .config
                .max_trial_duration
                .ok_or_else(|| missing("max_trial_duration"))?,
        })
    }

    /// Coordinate the pointer must have reached `elapsed` seconds into the trial
    pub fn get_expected_coord_at_time(&self, elapsed: f64) -> Result<f64, MotionError> {
        let profile = self.profile()?;
        Ok(self.expected_coord(&profile, elapsed))
    }

    fn expected_coord(&self, profile: &Profile, elapsed: f64) -> f64 {
        if elapsed >= profile.duration {
            return profile.end;
        }

        let total_distance = profile.end - profile.origin;
        let mut remaining = elapsed.max(0.0);
        let mut coord = profile.origin;

        for section in &self.config.sections {
            let section_duration = section.time_fraction * profile.duration;
            let section_distance = section.distance_fraction * total_distance;
            if remaining > section_duration {
                remaining -= section_duration;
                coord += section_distance;
            } else {
                return coord + section_distance * (remaining / section_duration);
            }
        }

        profile.end
    }
}

impl Validator for GlobalSpeedValidator {
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
        self.time0 = time0;
        self.guide = None;
    }

    fn check_xyt(&mut self, x: f64, y: f64, t: f64) -> Result<Validation, MotionError> {
        if !self.config.enabled {
            return Ok(Ok(()));
        }
        let profile = self.profile()?;

        let Some(time0) = self.time0 else {
            // first sample of the trial defines time zero
            self.time0 = Some(t);
            return Ok(Ok(()));
        };
        if t < time0 {
            return Err(MotionError::OutOfOrderTime {
                component: COMPONENT,
                previous: time0,
                current: t,
            });
        }

        let elapsed = t - time0;
        let coord = if self.config.axis == Axis::X { x } else { y };
        let expected_coord = self.expected_coord(&profile, elapsed);

        if elapsed <= self.config.grace_period {
            self.guide = Some(GuideReading {
                expected_coord,
                mode: GuideMode::Grace,
            });
            return Ok(Ok(()));
        }

        // a zero-length profile is only met by staying exactly on it
        let direction = progress_sign(profile.end - profile.origin);
        let d_coord = coord - expected_coord;
        if d_coord != 0.0 && progress_sign(d_coord) != direction {
            self.guide = Some(GuideReading {
                expected_coord,
                mode: GuideMode::Error,
            });
            debug!(
                validator = %self.config.name,
                expected_coord,
                actual_coord = coord,
                elapsed,
                "global speed validation failed"
            );
            return Ok(Err(ValidationFailure::new(
                FailureKind::TooSlow,
                self.config.name.clone(),
                "You moved too slowly",
            )
            .with_detail("expected_coord", expected_coord)
            .with_detail("actual_coord", coord)));
        }

        let expected_soon =
            self.expected_coord(&profile, elapsed + self.config.guide_warning_time_delta);
        let ahead_soon = coord - expected_soon;
        let reached_soon = ahead_soon == 0.0 || progress_sign(ahead_soon) == direction;
        self.guide = Some(GuideReading {
            expected_coord,
            mode: if reached_soon { GuideMode::Ok } else { GuideMode::Error },
        });

        Ok(Ok(()))
    }
}
