//! Circular trajectory: constant angular speed around a centre

use serde::{Deserialize, Serialize};

use super::{validate_time_arg, TrajectoryGenerator, TrajectoryPoint};
use crate::error::MotionError;

const COMPONENT: &str = "CircularTrajectoryGenerator";

/// Construction parameters of a [`CircularTrajectoryGenerator`].
///
/// Speed is given either as `degrees_per_sec` or as `full_rotation_duration`
/// (seconds per turn); when both are set `degrees_per_sec` wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CircularTrajectoryConfig {
    pub center: (i32, i32),
    pub radius: f64,
    #[serde(default)]
    pub degrees_per_sec: Option<f64>,
    #[serde(default)]
    pub full_rotation_duration: Option<f64>,
    #[serde(default)]
    pub degrees_at_t0: f64,
}

/// Moves a point clockwise around a circle; 0 degrees is straight up
#[derive(Debug, Clone, PartialEq)]
pub struct CircularTrajectoryGenerator {
    center: (i32, i32),
    radius: f64,
    degrees_per_sec: f64,
    degrees_at_t0: f64,
}

fn positive(field: &str, value: f64) -> Result<f64, MotionError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MotionError::config(
            COMPONENT,
            format!("{field} must be positive, got {value}"),
        ));
    }
    Ok(value)
}

impl CircularTrajectoryGenerator {
    pub fn new(config: CircularTrajectoryConfig) -> Result<Self, MotionError> {
        let radius = positive("radius", config.radius)?;
        let degrees_per_sec = match (config.degrees_per_sec, config.full_rotation_duration) {
            (Some(speed), _) => positive("degrees_per_sec", speed)?,
            (None, Some(duration)) => 360.0 / positive("full_rotation_duration", duration)?,
            (None, None) => {
                return Err(MotionError::config(
                    COMPONENT,
                    "either degrees_per_sec or full_rotation_duration is required",
                ))
            }
        };
        if !config.degrees_at_t0.is_finite() {
            return Err(MotionError::config(COMPONENT, "degrees_at_t0 must be a finite number"));
        }

        Ok(Self {
            center: config.center,
            radius,
            degrees_per_sec,
            degrees_at_t0: config.degrees_at_t0.rem_euclid(360.0),
        })
    }

    pub fn degrees_per_sec(&self) -> f64 {
        self.degrees_per_sec
    }

    pub fn full_rotation_duration(&self) -> f64 {
        360.0 / self.degrees_per_sec
    }

    /// Angular position (degrees in `[0, 360)`) at `time`
    pub fn degrees_at(&self, time: f64) -> f64 {
        (self.degrees_at_t0 + self.degrees_per_sec * time).rem_euclid(360.0)
    }
}

impl TrajectoryGenerator for CircularTrajectoryGenerator {
    fn get_traj_point(&mut self, time: f64) -> Result<TrajectoryPoint, MotionError> {
        validate_time_arg(COMPONENT, time)?;

        let degrees = self.degrees_at(time);
        let (sin, cos) = degrees.to_radians().sin_cos();

        // magnitudes are rounded first, then the quadrant decides the sign
        let mut x = (self.radius * sin).round().abs() as i32;
        let mut y = (self.radius * cos).round().abs() as i32;
        if degrees > 180.0 {
            x = -x;
        }
        if degrees > 90.0 && degrees < 270.0 {
            y = -y;
        }

        Ok(TrajectoryPoint::new(
            x + self.center.0,
            y + self.center.1,
            true,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn generator(degrees_at_t0: f64) -> CircularTrajectoryGenerator {
        CircularTrajectoryGenerator::new(CircularTrajectoryConfig {
            center: (10, 20),
            radius: 100.0,
            degrees_per_sec: Some(90.0),
            degrees_at_t0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_requires_speed_and_radius() {
        let config = CircularTrajectoryConfig {
            radius: 10.0,
            ..Default::default()
        };
        assert!(CircularTrajectoryGenerator::new(config).is_err());

        let config = CircularTrajectoryConfig {
            radius: 0.0,
            degrees_per_sec: Some(10.0),
            ..Default::default()
        };
        assert!(CircularTrajectoryGenerator::new(config).is_err());
    }

    #[test]
    fn test_quarter_turns_clockwise_from_top() {
        let mut g = generator(0.0);
        assert_eq!(g.get_traj_point(0.0).unwrap(), TrajectoryPoint::new(10, 120, true));
        assert_eq!(g.get_traj_point(1.0).unwrap(), TrajectoryPoint::new(110, 20, true));
        assert_eq!(g.get_traj_point(2.0).unwrap(), TrajectoryPoint::new(10, -80, true));
        assert_eq!(g.get_traj_point(3.0).unwrap(), TrajectoryPoint::new(-90, 20, true));
        assert_eq!(g.get_traj_point(4.0).unwrap(), TrajectoryPoint::new(10, 120, true));
    }

    #[test]
    fn test_full_rotation_duration() {
        let mut g = CircularTrajectoryGenerator::new(CircularTrajectoryConfig {
            center: (0, 0),
            radius: 50.0,
            full_rotation_duration: Some(2.0),
            degrees_at_t0: -90.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(g.degrees_per_sec(), 180.0);
        assert_eq!(g.get_traj_point(0.0).unwrap(), TrajectoryPoint::new(-50, 0, true));
        assert_eq!(g.get_traj_point(0.5).unwrap(), TrajectoryPoint::new(0, 50, true));
    }

    #[test]
    fn test_negative_time_rejected() {
        let mut g = generator(0.0);
        assert!(matches!(
            g.get_traj_point(-1.0),
            Err(MotionError::InvalidArgument(_))
        ));
    }
}
