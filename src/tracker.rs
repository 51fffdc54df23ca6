//! Trajectory tracker: records the pointer path of the current trial

use serde::{Deserialize, Serialize};

use crate::error::MotionError;
use crate::types::Sample;

/// One recorded point, labelled with its trial number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedRow {
    pub trial: u32,
    pub time: f64,
    pub x: f64,
    pub y: f64,
}

/// Records `(x, y, t)` while tracking is active
#[derive(Debug, Clone, Default)]
pub struct TrajectoryTracker {
    tracking_active: bool,
    points: Vec<Sample>,
}

impl TrajectoryTracker {
    pub fn new(tracking_active: bool) -> Self {
        Self {
            tracking_active,
            points: Vec::new(),
        }
    }

    pub fn tracking_active(&self) -> bool {
        self.tracking_active
    }

    pub fn set_tracking_active(&mut self, active: bool) {
        self.tracking_active = active;
    }

    /// Forget recorded points; optionally switch tracking on or off
    pub fn reset(&mut self, tracking_active: Option<bool>) {
        if let Some(active) = tracking_active {
            self.tracking_active = active;
        }
        self.points.clear();
    }

    /// Record a point; ignored while tracking is inactive
    pub fn track(&mut self, x: f64, y: f64, t: f64) -> Result<(), MotionError> {
        if !self.tracking_active {
            return Ok(());
        }
        if !t.is_finite() || t < 0.0 {
            return Err(MotionError::InvalidArgument(format!(
                "TrajectoryTracker.track(): negative or non-finite time ({t}) is invalid"
            )));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(MotionError::InvalidArgument(format!(
                "TrajectoryTracker.track(): non-finite coordinate ({x}, {y})"
            )));
        }
        self.points.push(Sample::new(x, y, t));
        Ok(())
    }

    pub fn points(&self) -> &[Sample] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Recorded points as rows of the given trial
    pub fn rows(&self, trial: u32) -> Vec<TrackedRow> {
        self.points
            .iter()
            .map(|p| TrackedRow {
                trial,
                time: p.t,
                x: p.x,
                y: p.y,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inactive_tracker_ignores_points() {
        let mut tracker = TrajectoryTracker::default();
        tracker.track(1.0, 2.0, 0.0).unwrap();
        assert!(tracker.is_empty());

        tracker.set_tracking_active(true);
        tracker.track(1.0, 2.0, 0.0).unwrap();
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_negative_time_rejected() {
        let mut tracker = TrajectoryTracker::new(true);
        assert!(tracker.track(0.0, 0.0, -0.1).is_err());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_rows_and_reset() {
        let mut tracker = TrajectoryTracker::new(true);
        tracker.track(1.0, 2.0, 0.0).unwrap();
        tracker.track(3.0, 4.0, 0.5).unwrap();

        assert_eq!(
            tracker.rows(7),
            vec![
                TrackedRow { trial: 7, time: 0.0, x: 1.0, y: 2.0 },
                TrackedRow { trial: 7, time: 0.5, x: 3.0, y: 4.0 },
            ]
        );

        tracker.reset(Some(false));
        assert!(tracker.is_empty());
        assert!(!tracker.tracking_active());
    }
}
