//! Kinematic monitor
//!
//! Turns the raw `(x, y, t)` stream into instantaneous speed and direction,
//! each computed between the window anchor and the newest sample.

use crate::error::MotionError;
use crate::geometry::{axis_displacement, movement_angle};
use crate::types::{Axis, Sample};
use crate::window::{SampleWindow, WindowSpan};

const COMPONENT: &str = "MovementMonitor";

/// Instantaneous speed and direction of the pointer
#[derive(Debug, Clone)]
pub struct MovementMonitor {
    units_per_mm: f64,
    window: SampleWindow,
}

impl MovementMonitor {
    /// `units_per_mm` converts caller coordinates to millimetres; `interval` is the
    /// minimal span (seconds or mm) between the two samples of a derivative.
    pub fn new(units_per_mm: f64, interval: WindowSpan) -> Result<Self, MotionError> {
        validate_units_per_mm(COMPONENT, units_per_mm)?;

        Ok(Self {
            units_per_mm,
            window: SampleWindow::new(COMPONENT, interval)?,
        })
    }

    pub fn units_per_mm(&self) -> f64 {
        self.units_per_mm
    }

    pub fn interval(&self) -> WindowSpan {
        self.window.span()
    }

    /// Start a new trial
    pub fn reset(&mut self, time0: Option<f64>) {
        self.window.reset(time0);
    }

    /// Record a new pointer position (caller units)
    pub fn update_xyt(&mut self, x: f64, y: f64, t: f64) -> Result<(), MotionError> {
        self.window.push(Sample::new(
            x / self.units_per_mm,
            y / self.units_per_mm,
            t,
        ))
    }

    /// Speed along an axis in mm/sec; signed for X and Y
    pub fn speed(&self, axis: Axis) -> Option<f64> {
        let (anchor, newest) = self.window.pair()?;
        let dt = newest.t - anchor.t;
        if dt <= 0.0 {
            return None;
        }
        Some(axis_displacement(axis, anchor, newest) / dt)
    }

    pub fn x_speed(&self) -> Option<f64> {
        self.speed(Axis::X)
    }

    pub fn y_speed(&self) -> Option<f64> {
        self.speed(Axis::Y)
    }

    pub fn xy_speed(&self) -> Option<f64> {
        self.speed(Axis::XY)
    }

    /// Movement direction in radians (0 = up, clockwise).
    ///
    /// Unavailable until the anchor and the newest sample are distinct points.
    pub fn angle(&self) -> Option<f64> {
        let (anchor, newest) = self.window.pair()?;
        if anchor.same_position(newest) {
            return None;
        }
        Some(movement_angle(anchor, newest))
    }

    pub fn angle_degrees(&self) -> Option<f64> {
        self.angle().map(f64::to_degrees)
    }

    /// Seconds since the trial started (reset time, or first sample)
    pub fn elapsed_trial_time(&self) -> Option<f64> {
        self.window.elapsed()
    }

    /// Seconds between the two samples used by the last speed/angle computation
    pub fn last_interval_duration(&self) -> Option<f64> {
        self.window.last_interval()
    }

    /// Newest sample, in millimetres
    pub fn last_sample(&self) -> Option<&Sample> {
        self.window.newest()
    }
}

pub(crate) fn validate_units_per_mm(component: &str, units_per_mm: f64) -> Result<(), MotionError> {
    if !units_per_mm.is_finite() || units_per_mm <= 0.0 {
        return Err(MotionError::config(
            component,
            format!("units_per_mm must be positive, got {units_per_mm}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn monitor(units_per_mm: f64) -> MovementMonitor {
        MovementMonitor::new(units_per_mm, WindowSpan::Duration(0.0)).unwrap()
    }

    #[test]
    fn test_invalid_units_per_mm() {
        assert!(MovementMonitor::new(0.0, WindowSpan::Duration(0.0)).is_err());
        assert!(MovementMonitor::new(-2.0, WindowSpan::Duration(0.0)).is_err());
    }

    #[test]
    fn test_speed_unavailable_before_anchor() {
        let mut m = monitor(1.0);
        assert_eq!(m.y_speed(), None);
        m.update_xyt(0.0, 0.0, 0.0).unwrap();
        assert_eq!(m.y_speed(), None);
        assert_eq!(m.angle(), None);
        assert_eq!(m.elapsed_trial_time(), Some(0.0));
    }

    #[test]
    fn test_speed_independent_of_unit_scaling() {
        for units_per_mm in [1.0, 2.5, 10.0] {
            let mut m = monitor(units_per_mm);
            m.update_xyt(0.0, 0.0, 0.0).unwrap();
            m.update_xyt(3.0 * units_per_mm, 4.0 * units_per_mm, 0.5).unwrap();

            assert_abs_diff_eq!(m.x_speed().unwrap(), 6.0, epsilon = 1e-9);
            assert_abs_diff_eq!(m.y_speed().unwrap(), 8.0, epsilon = 1e-9);
            assert_abs_diff_eq!(m.xy_speed().unwrap(), 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_signed_axis_speed() {
        let mut m = monitor(1.0);
        m.update_xyt(10.0, 10.0, 0.0).unwrap();
        m.update_xyt(8.0, 5.0, 1.0).unwrap();
        assert_eq!(m.x_speed(), Some(-2.0));
        assert_eq!(m.y_speed(), Some(-5.0));
    }

    #[test]
    fn test_zero_dt_gives_no_speed() {
        let mut m = monitor(1.0);
        m.update_xyt(0.0, 0.0, 1.0).unwrap();
        m.update_xyt(0.0, 5.0, 1.0).unwrap();
        assert_eq!(m.y_speed(), None);
    }

    #[test]
    fn test_angle_and_intervals() {
        let mut m = MovementMonitor::new(1.0, WindowSpan::Duration(0.2)).unwrap();
        m.reset(Some(0.0));
        m.update_xyt(0.0, 0.0, 0.1).unwrap();
        m.update_xyt(5.0, 0.0, 0.2).unwrap();
        assert_eq!(m.angle(), None);

        m.update_xyt(10.0, 0.0, 0.35).unwrap();
        assert_abs_diff_eq!(m.angle_degrees().unwrap(), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.last_interval_duration().unwrap(), 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(m.elapsed_trial_time().unwrap(), 0.35, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut m = monitor(1.0);
        m.update_xyt(0.0, 0.0, 5.0).unwrap();
        m.update_xyt(0.0, 1.0, 6.0).unwrap();
        m.reset(None);
        m.update_xyt(0.0, 0.0, 0.0).unwrap();
        assert_eq!(m.y_speed(), None);
        assert!(m.last_sample().is_some());
    }
}
