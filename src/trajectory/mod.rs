//! Trajectory generation
//!
//! The inverse of validation: given the time since a trial started, tell where
//! a moving stimulus should be.

mod circular;
mod custom;

pub use circular::{CircularTrajectoryGenerator, CircularTrajectoryConfig};
pub use custom::{parse_csv_table, CustomTrajectoryGenerator, TimePoint};

use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Position and visibility of the stimulus at one moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub x: i32,
    pub y: i32,
    pub visible: bool,
}

impl TrajectoryPoint {
    pub fn new(x: i32, y: i32, visible: bool) -> Self {
        Self { x, y, visible }
    }
}

/// Source of stimulus positions over time
pub trait TrajectoryGenerator {
    /// Point at `time` seconds since the trial started
    fn get_traj_point(&mut self, time: f64) -> Result<TrajectoryPoint, MotionError>;
}

pub(crate) fn validate_time_arg(component: &str, time: f64) -> Result<(), MotionError> {
    if !time.is_finite() || time < 0.0 {
        return Err(MotionError::InvalidArgument(format!(
            "{component}.get_traj_point() was called with an invalid time ({time})"
        )));
    }
    Ok(())
}
