//! Custom trajectories defined point by point
//!
//! Stores any number of named trajectories, each a strictly time-increasing
//! list of `(time, x, y, visible)` points, and plays back the active one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{validate_time_arg, TrajectoryGenerator, TrajectoryPoint};
use crate::error::MotionError;

const COMPONENT: &str = "CustomTrajectoryGenerator";

/// Trajectory id used for bulk loads without a `traj_id` column
const DEFAULT_TRAJ_ID: &str = "1";

/// One defined point of a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub time: f64,
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl TimePoint {
    pub fn new(time: f64, x: i32, y: i32) -> Self {
        Self {
            time,
            x,
            y,
            visible: true,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

#[derive(Debug, Clone)]
struct Trajectory {
    points: Vec<TimePoint>,
}

impl Trajectory {
    fn start(&self) -> f64 {
        self.points.first().map_or(0.0, |p| p.time)
    }

    fn duration(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }
}

/// Plays back explicitly defined trajectories
#[derive(Debug, Clone)]
pub struct CustomTrajectoryGenerator {
    trajectories: BTreeMap<String, Trajectory>,
    active_traj_id: Option<String>,
    cyclic: bool,
    interpolate: bool,
    /// Cached result of [`Self::validate`]; cleared whenever it may change
    validation: Option<Result<(), String>>,
}

impl Default for CustomTrajectoryGenerator {
    fn default() -> Self {
        Self::new(false, true)
    }
}

impl CustomTrajectoryGenerator {
    pub fn new(cyclic: bool, interpolate: bool) -> Self {
        Self {
            trajectories: BTreeMap::new(),
            active_traj_id: None,
            cyclic,
            interpolate,
            validation: None,
        }
    }

    pub fn cyclic(&self) -> bool {
        self.cyclic
    }

    pub fn set_cyclic(&mut self, cyclic: bool) {
        self.cyclic = cyclic;
        self.validation = None;
    }

    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    pub fn set_interpolate(&mut self, interpolate: bool) {
        self.interpolate = interpolate;
    }

    /// Forget every stored trajectory
    pub fn clear_all_trajectories(&mut self) {
        self.trajectories.clear();
        self.active_traj_id = None;
        self.validation = None;
    }

    /// Ids of the stored trajectories, in ascending order
    pub fn traj_ids(&self) -> impl Iterator<Item = &str> {
        self.trajectories.keys().map(String::as_str)
    }

    /// Time of the first point of a stored trajectory
    pub fn start_time(&self, traj_id: &str) -> Option<f64> {
        self.trajectories.get(traj_id).map(Trajectory::start)
    }

    /// Duration (time of the last point) of a stored trajectory
    pub fn duration(&self, traj_id: &str) -> Option<f64> {
        self.trajectories.get(traj_id).map(Trajectory::duration)
    }

    /// Add a trajectory, or replace the one with the same id
    pub fn set_trajectory(
        &mut self,
        traj_id: impl Into<String>,
        points: Vec<TimePoint>,
    ) -> Result<(), MotionError> {
        let traj_id = traj_id.into();
        if points.is_empty() {
            return Err(MotionError::InvalidArgument(format!(
                "{COMPONENT}.set_trajectory(): trajectory '{traj_id}' has no points"
            )));
        }

        let mut prev_time: Option<f64> = None;
        for (i, point) in points.iter().enumerate() {
            if !point.time.is_finite() || point.time < 0.0 {
                return Err(MotionError::InvalidArgument(format!(
                    "{COMPONENT}.set_trajectory(): trajectory '{traj_id}' point {i} has an invalid time ({})",
                    point.time
                )));
            }
            if let Some(prev) = prev_time {
                if point.time <= prev {
                    return Err(MotionError::InvalidArgument(format!(
                        "{COMPONENT}.set_trajectory(): in trajectory '{traj_id}', time point {} appeared after {prev}",
                        point.time
                    )));
                }
            }
            prev_time = Some(point.time);
        }

        debug!(traj_id = %traj_id, n_points = points.len(), "trajectory stored");
        self.trajectories.insert(traj_id, Trajectory { points });
        self.validation = None;
        Ok(())
    }

    pub fn active_traj_id(&self) -> Option<&str> {
        self.active_traj_id.as_deref()
    }

    /// Select the trajectory to play; `None` falls back to the first stored id
    pub fn set_active_traj_id(&mut self, traj_id: Option<&str>) -> Result<(), MotionError> {
        if let Some(id) = traj_id {
            if !self.trajectories.contains_key(id) {
                return Err(MotionError::InvalidArgument(format!(
                    "{COMPONENT}: there is no trajectory with id '{id}'"
                )));
            }
        }
        self.active_traj_id = traj_id.map(str::to_string);
        Ok(())
    }

    /// Check the configuration; the outcome is cached until it may change
    pub fn validate(&mut self) -> Result<(), MotionError> {
        if self.validation.is_none() {
            self.validation = Some(self.compute_validation());
        }
        match &self.validation {
            Some(Err(message)) => Err(MotionError::InvalidConfig(message.clone())),
            _ => Ok(()),
        }
    }

    fn compute_validation(&self) -> Result<(), String> {
        if !self.cyclic {
            return Ok(());
        }
        for (traj_id, trajectory) in &self.trajectories {
            let start = trajectory.start();
            if start > 0.0 {
                warn!(traj_id = %traj_id, start, "cyclic trajectory does not start at time 0");
                return Err(format!(
                    "{COMPONENT}: when cyclic, all trajectories must start from time=0, \
                     but trajectory '{traj_id}' starts from time={start}"
                ));
            }
        }
        Ok(())
    }

    fn active_trajectory(&mut self) -> Result<(&str, &Trajectory), MotionError> {
        if self.active_traj_id.is_none() {
            self.active_traj_id = self.trajectories.keys().next().cloned();
        }
        let Some(id) = self.active_traj_id.as_deref() else {
            return Err(MotionError::InvalidState(format!(
                "{COMPONENT}.get_traj_point() cannot be called before a trajectory was set"
            )));
        };
        match self.trajectories.get(id) {
            Some(trajectory) => Ok((id, trajectory)),
            None => Err(MotionError::InvalidState(format!(
                "{COMPONENT}: active trajectory '{id}' no longer exists"
            ))),
        }
    }

    /// Bulk-load trajectories from tabular rows.
    ///
    /// Required columns are `x`, `y` and `time`; `visible` and `traj_id` are
    /// optional. Rows of one trajectory must be consecutive. Nothing is stored
    /// unless the whole table is valid. Returns the ids loaded, in table order.
    pub fn load_rows<S: AsRef<str>>(
        &mut self,
        columns: &[S],
        rows: &[Vec<S>],
    ) -> Result<Vec<String>, MotionError> {
        let column = |name: &str| columns.iter().position(|c| c.as_ref().trim() == name);

        let traj_id_col = column("traj_id");
        let visible_col = column("visible");
        if !self.trajectories.is_empty() && traj_id_col.is_none() {
            warn!("bulk load refused: no traj_id column while trajectories are already stored");
            return Err(MotionError::BadFormat(
                "there is no traj_id column in the table".to_string(),
            ));
        }
        let mut required = [0usize; 3];
        for (slot, name) in required.iter_mut().zip(["x", "y", "time"]) {
            *slot = column(name).ok_or_else(|| {
                MotionError::BadFormat(format!("there is no '{name}' column in the table"))
            })?;
        }
        let [x_col, y_col, time_col] = required;

        let mut groups: Vec<(String, Vec<TimePoint>)> = Vec::new();
        for (line, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(MotionError::BadFormat(format!(
                    "row {line} has {} cells but the table has {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            let cell = |i: usize| row[i].as_ref().trim();

            let traj_id = traj_id_col.map_or(DEFAULT_TRAJ_ID, cell).to_string();
            let point = TimePoint {
                time: parse_cell(cell(time_col), "time", line)?,
                x: parse_cell(cell(x_col), "x", line)?,
                y: parse_cell(cell(y_col), "y", line)?,
                visible: visible_col.map_or(true, |i| parse_visible(cell(i))),
            };

            match groups.last_mut() {
                Some((id, points)) if *id == traj_id => points.push(point),
                _ => {
                    if groups.iter().any(|(id, _)| *id == traj_id) {
                        return Err(MotionError::BadFormat(format!(
                            "the rows of trajectory '{traj_id}' are not consecutive"
                        )));
                    }
                    groups.push((traj_id, vec![point]));
                }
            }
        }

        // validate every group before storing any of them
        let mut staged = self.clone();
        for (traj_id, points) in &groups {
            staged.set_trajectory(traj_id.clone(), points.clone())?;
        }
        *self = staged;

        Ok(groups.into_iter().map(|(id, _)| id).collect())
    }
}

fn parse_cell<T: std::str::FromStr>(value: &str, column: &str, line: usize) -> Result<T, MotionError> {
    value.parse().map_err(|_| {
        MotionError::ParseError(format!(
            "invalid {column} value '{value}' in row {line}"
        ))
    })
}

/// "0" and anything starting with f/F mean invisible
fn parse_visible(value: &str) -> bool {
    !(value == "0" || value.to_lowercase().starts_with('f'))
}

/// Split simple comma-separated text into a header and rows.
///
/// Blank lines are skipped and cells are trimmed; quoting is not supported.
pub fn parse_csv_table(text: &str) -> Result<(Vec<String>, Vec<Vec<String>>), MotionError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let split = |line: &str| -> Vec<String> { line.split(',').map(|c| c.trim().to_string()).collect() };

    let header = lines
        .next()
        .map(split)
        .ok_or_else(|| MotionError::BadFormat("the table is empty".to_string()))?;
    let rows = lines.map(split).collect();
    Ok((header, rows))
}

impl TrajectoryGenerator for CustomTrajectoryGenerator {
    fn get_traj_point(&mut self, time: f64) -> Result<TrajectoryPoint, MotionError> {
        self.validate()?;
        validate_time_arg(COMPONENT, time)?;

        let cyclic = self.cyclic;
        let interpolate = self.interpolate;
        let (traj_id, trajectory) = self.active_trajectory()?;

        let start = trajectory.start();
        if time < start {
            return Err(MotionError::InvalidArgument(format!(
                "{COMPONENT}.get_traj_point(time={time}): the active trajectory ('{traj_id}') starts from time={start}"
            )));
        }

        let duration = trajectory.duration();
        let time = if time <= duration {
            time
        } else if cyclic && duration > 0.0 {
            time % duration
        } else {
            duration
        };

        let points = &trajectory.points;
        let i_before = points.partition_point(|p| p.time <= time).saturating_sub(1);
        let before = points[i_before];

        let after = if before.time == time {
            before
        } else {
            points[(i_before + 1).min(points.len() - 1)]
        };

        if !interpolate || before.time == after.time {
            return Ok(TrajectoryPoint::new(before.x, before.y, before.visible));
        }

        let weight_after = (time - before.time) / (after.time - before.time);
        let weight_before = 1.0 - weight_after;
        let x = (before.x as f64 * weight_before + after.x as f64 * weight_after).round() as i32;
        let y = (before.y as f64 * weight_before + after.y as f64 * weight_after).round() as i32;
        let visible = if weight_before >= weight_after {
            before.visible
        } else {
            after.visible
        };

        Ok(TrajectoryPoint::new(x, y, visible))
    }
}
