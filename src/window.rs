//! Bounded sample window
//!
//! Keeps the recent, time-ordered samples of one trial plus an "anchor": the
//! sample used as the "before" point when computing a derivative against the
//! newest sample. Two retention policies exist:
//!
//! - [`WindowSpan::Distance`]: the anchor is the most recent retained sample lying
//!   at least the given distance away from the new sample. Older samples are dropped.
//! - [`WindowSpan::Duration`]: the anchor is the newest sample taken at or before
//!   `now - seconds`. Once set, it stays until a newer sample qualifies.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::MotionError;
use crate::types::Sample;

/// Retention policy for a [`SampleWindow`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpan {
    /// Minimal spatial distance (in base units) between anchor and newest sample
    Distance(f64),
    /// Minimal duration (seconds) between anchor and newest sample
    Duration(f64),
}

impl WindowSpan {
    fn value(&self) -> f64 {
        match self {
            WindowSpan::Distance(v) | WindowSpan::Duration(v) => *v,
        }
    }
}

/// Time-ordered window of recent samples with an anchor
#[derive(Debug, Clone)]
pub struct SampleWindow {
    component: &'static str,
    span: WindowSpan,
    recent: VecDeque<Sample>,
    anchor: Option<Sample>,
    time0: Option<f64>,
}

impl SampleWindow {
    /// Create a window; `component` names the owner in sequencing errors
    pub fn new(component: &'static str, span: WindowSpan) -> Result<Self, MotionError> {
        let value = span.value();
        if !value.is_finite() || value < 0.0 {
            return Err(MotionError::config(
                component,
                format!("window span must be a non-negative number, got {value}"),
            ));
        }

        Ok(Self {
            component,
            span,
            recent: VecDeque::new(),
            anchor: None,
            time0: None,
        })
    }

    pub fn span(&self) -> WindowSpan {
        self.span
    }

    /// Forget all samples. `time0`, when given, becomes the trial-zero reference.
    pub fn reset(&mut self, time0: Option<f64>) {
        self.recent.clear();
        self.anchor = None;
        self.time0 = time0;
    }

    /// Append a sample and re-anchor the window.
    ///
    /// Fails when `sample.t` precedes the last seen time (or the reset time).
    pub fn push(&mut self, sample: Sample) -> Result<(), MotionError> {
        if let Some(previous) = self.last_time() {
            if sample.t < previous {
                return Err(MotionError::OutOfOrderTime {
                    component: self.component,
                    previous,
                    current: sample.t,
                });
            }
        }

        if self.time0.is_none() {
            self.time0 = Some(sample.t);
        }

        match self.span {
            WindowSpan::Distance(distance) => self.anchor_by_distance(&sample, distance),
            WindowSpan::Duration(seconds) => self.anchor_by_time(sample.t - seconds),
        }

        self.recent.push_back(sample);
        trace!(
            component = self.component,
            retained = self.recent.len(),
            has_anchor = self.anchor.is_some(),
            "window updated"
        );

        Ok(())
    }

    fn anchor_by_distance(&mut self, sample: &Sample, distance: f64) {
        let min_sq = distance * distance;

        self.anchor = None;
        let found = self
            .recent
            .iter()
            .rposition(|s| s.distance_sq(sample) >= min_sq);

        if let Some(i) = found {
            self.anchor = Some(self.recent[i]);
            self.recent.drain(..i);
        }
    }

    fn anchor_by_time(&mut self, latest_good_time: f64) {
        let found = self.recent.iter().rposition(|s| s.t <= latest_good_time);

        if let Some(i) = found {
            self.anchor = Some(self.recent[i]);
            self.recent.drain(..=i);
        }
    }

    fn last_time(&self) -> Option<f64> {
        self.recent.back().map(|s| s.t).or(self.time0)
    }

    /// The "before" point of the current derivative, if established
    pub fn anchor(&self) -> Option<&Sample> {
        self.anchor.as_ref()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.recent.back()
    }

    /// Anchor and newest sample together, when both exist
    pub fn pair(&self) -> Option<(&Sample, &Sample)> {
        Some((self.anchor.as_ref()?, self.recent.back()?))
    }

    /// Number of retained samples (anchor excluded for time-based windows)
    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn time0(&self) -> Option<f64> {
        self.time0
    }

    /// Time from trial start to the newest sample
    pub fn elapsed(&self) -> Option<f64> {
        Some(self.recent.back()?.t - self.time0?)
    }

    /// Time between anchor and newest sample
    pub fn last_interval(&self) -> Option<f64> {
        let (anchor, newest) = self.pair()?;
        Some(newest.t - anchor.t)
    }
}
