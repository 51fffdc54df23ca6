//! Curve detection
//!
//! Counts reversals of angular direction ("curves") in the movement angle
//! stream. A change of direction first becomes a candidate; it is committed as
//! a curve only once the angle has moved far enough from where the previous
//! direction was last seen, so sub-threshold jitter never counts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MotionError;
use crate::geometry::short_arc;
use crate::monitor::MovementMonitor;
use crate::types::{AngleUnits, Sample};
use crate::window::WindowSpan;

const COMPONENT: &str = "CurveDetector";

/// Direction in which the movement angle is turning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveDirection {
    Clockwise,
    CounterClockwise,
}

impl CurveDirection {
    /// +1 for clockwise, -1 for counter-clockwise
    pub fn sign(&self) -> i8 {
        match self {
            CurveDirection::Clockwise => 1,
            CurveDirection::CounterClockwise => -1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CurveCandidate {
    direction: CurveDirection,
    start_angle: f64,
    start_index: usize,
    start_xyt: Option<Sample>,
    /// Last angle observed before the direction changed
    pre_curve_angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CommittedCurve {
    direction: CurveDirection,
    start_angle: f64,
    start_index: usize,
    start_xyt: Option<Sample>,
}

/// Hysteresis state machine over the movement angle
#[derive(Debug, Clone)]
pub struct CurveDetector {
    monitor: MovementMonitor,
    angle_units: AngleUnits,
    zero_angle: f64,
    min_angle_change_per_curve: f64,

    n_samples: usize,
    last_xyt: Option<Sample>,
    curr_angle: Option<f64>,
    curve: Option<CommittedCurve>,
    candidate: Option<CurveCandidate>,
    n_curves: usize,
}

impl CurveDetector {
    /// `min_distance_mm` is the minimal displacement over which the angle is
    /// computed; `zero_angle` and `min_angle_change_per_curve` are in `angle_units`.
    pub fn new(
        units_per_mm: f64,
        min_distance_mm: f64,
        angle_units: AngleUnits,
        zero_angle: f64,
        min_angle_change_per_curve: f64,
    ) -> Result<Self, MotionError> {
        if !zero_angle.is_finite() {
            return Err(MotionError::config(COMPONENT, "zero_angle must be a finite number"));
        }
        if !min_angle_change_per_curve.is_finite() || min_angle_change_per_curve < 0.0 {
            return Err(MotionError::config(
                COMPONENT,
                format!(
                    "min_angle_change_per_curve must be non-negative, got {min_angle_change_per_curve}"
                ),
            ));
        }

        let monitor = MovementMonitor::new(units_per_mm, WindowSpan::Distance(min_distance_mm))?;

        Ok(Self {
            monitor,
            angle_units,
            zero_angle,
            min_angle_change_per_curve,
            n_samples: 0,
            last_xyt: None,
            curr_angle: None,
            curve: None,
            candidate: None,
            n_curves: 0,
        })
    }

    pub fn angle_units(&self) -> AngleUnits {
        self.angle_units
    }

    pub fn zero_angle(&self) -> f64 {
        self.zero_angle
    }

    pub fn min_angle_change_per_curve(&self) -> f64 {
        self.min_angle_change_per_curve
    }

    /// Start a new trial
    pub fn reset(&mut self, time0: Option<f64>) {
        self.monitor.reset(time0);
        self.n_samples = 0;
        self.last_xyt = None;
        self.curr_angle = None;
        self.curve = None;
        self.candidate = None;
        self.n_curves = 0;
    }

    /// Record a pointer position and update the curve state
    pub fn update_xyt(&mut self, x: f64, y: f64, t: f64) -> Result<(), MotionError> {
        self.monitor.update_xyt(x, y, t)?;
        self.last_xyt = Some(Sample::new(x, y, t));

        let reading = self
            .monitor
            .angle()
            .map(|radians| self.angle_units.from_radians(radians));
        self.push_angle(reading);
        Ok(())
    }

    /// Feed one angle reading (in `angle_units`, 0 = up) directly.
    ///
    /// `None` means the direction is currently unknown; it interrupts the
    /// comparison with the previous reading but keeps the curve state.
    pub fn push_angle(&mut self, reading: Option<f64>) {
        let index = self.n_samples;
        self.n_samples += 1;

        let prev = self.curr_angle;
        self.curr_angle = reading.map(|a| self.rotate(a));

        if let (Some(curr), Some(prev)) = (self.curr_angle, prev) {
            self.check_new_curve(curr, prev, index);
        }
    }

    /// Apply `zero_angle` and normalise to `(-half_turn, half_turn]`
    fn rotate(&self, angle: f64) -> f64 {
        let full = self.angle_units.full_turn();
        let a = (angle - self.zero_angle).rem_euclid(full);
        if a > full / 2.0 {
            a - full
        } else {
            a
        }
    }

    fn check_new_curve(&mut self, curr: f64, prev: f64, index: usize) {
        let full = self.angle_units.full_turn();

        let change = (curr - prev).rem_euclid(full);
        if change == 0.0 {
            return;
        }

        let direction = if change <= full / 2.0 {
            CurveDirection::Clockwise
        } else {
            CurveDirection::CounterClockwise
        };

        if self.curve.map(|c| c.direction) == Some(direction) {
            // still turning the same way
            self.candidate = None;
            return;
        }

        let candidate = match self.candidate {
            Some(c) if c.direction == direction => c,
            _ => CurveCandidate {
                direction,
                start_angle: curr,
                start_index: index,
                start_xyt: self.last_xyt,
                pre_curve_angle: prev,
            },
        };

        if short_arc(curr - candidate.pre_curve_angle, full) >= self.min_angle_change_per_curve {
            self.n_curves += 1;
            self.curve = Some(CommittedCurve {
                direction,
                start_angle: candidate.start_angle,
                start_index: candidate.start_index,
                start_xyt: candidate.start_xyt,
            });
            self.candidate = None;
            debug!(
                n_curves = self.n_curves,
                direction = ?direction,
                start_index = candidate.start_index,
                "curve committed"
            );
        } else {
            self.candidate = Some(candidate);
        }
    }

    /// Current angle in `angle_units`, rotated by `zero_angle`
    pub fn curr_angle(&self) -> Option<f64> {
        self.curr_angle
    }

    pub fn curr_curve_direction(&self) -> Option<CurveDirection> {
        self.curve.map(|c| c.direction)
    }

    pub fn curr_curve_start_angle(&self) -> Option<f64> {
        self.curve.map(|c| c.start_angle)
    }

    /// Index (0-based, since reset) of the sample at which the current curve began
    pub fn curr_curve_start_sample(&self) -> Option<usize> {
        self.curve.map(|c| c.start_index)
    }

    /// Caller-unit coordinates and time at which the current curve began
    pub fn curr_curve_start_xyt(&self) -> Option<Sample> {
        self.curve.and_then(|c| c.start_xyt)
    }

    /// Number of curves committed since the last reset
    pub fn n_curves(&self) -> usize {
        self.n_curves
    }
}
