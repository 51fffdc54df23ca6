//! Pipeline orchestration
//!
//! This module provides the host-loop side of Motion Flux: every pointer
//! sample of a trial is handed to all configured validators, the curve
//! detector and the trajectory tracker, in that order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::TrialConfig;
use crate::curves::CurveDetector;
use crate::error::MotionError;
use crate::tracker::{TrackedRow, TrajectoryTracker};
use crate::types::Sample;
use crate::validation::ValidationFailure;
use crate::validators::Validator;
use crate::{MFLUX_VERSION, PRODUCER_NAME};

/// Result of validating one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleOutcome {
    /// Zero-based index of the sample within the trial
    pub sample_index: usize,
    pub t: f64,
    pub failures: Vec<ValidationFailure>,
    /// Curves committed so far; `None` without a curve detector
    pub curve_count: Option<usize>,
}

impl SampleOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Summary of a whole trial, as produced by [`run_trial`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    pub producer: String,
    pub version: String,
    pub run_id: String,
    pub computed_at_utc: DateTime<Utc>,
    pub samples_processed: usize,
    pub passed: bool,
    pub failed_at_sample: Option<usize>,
    pub failures: Vec<ValidationFailure>,
    pub curve_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trajectory: Vec<TrackedRow>,
}

/// Run a complete trial from JSON inputs.
///
/// # Arguments
/// * `config_json` - A [`TrialConfig`] document
/// * `samples_json` - Array of `{"x", "y", "t"}` objects in time order
///
/// # Returns
/// A JSON [`TrialReport`]. Processing stops at the first sample that fails
/// any validator.
///
/// # Example
/// ```ignore
/// let report = run_trial(
///     r#"{"speed": {"axis": "y", "min_speed": 1.0}}"#,
///     r#"[{"x": 0, "y": 0, "t": 0}, {"x": 0, "y": 2, "t": 1}]"#,
/// )?;
/// ```
pub fn run_trial(config_json: &str, samples_json: &str) -> Result<String, MotionError> {
    let config = TrialConfig::from_json(config_json)?;
    let samples: Vec<Sample> = serde_json::from_str(samples_json)?;

    let mut processor = TrialProcessor::from_config(&config)?;
    processor.start_trial(config.start_time);

    let mut failed_at_sample = None;
    let mut failures = Vec::new();
    for sample in samples {
        let outcome = processor.process_sample(sample)?;
        if !outcome.passed() {
            failed_at_sample = Some(outcome.sample_index);
            failures = outcome.failures;
            break;
        }
    }

    let report = TrialReport {
        producer: PRODUCER_NAME.to_string(),
        version: MFLUX_VERSION.to_string(),
        run_id: Uuid::new_v4().to_string(),
        computed_at_utc: Utc::now(),
        samples_processed: processor.samples_processed(),
        passed: failed_at_sample.is_none(),
        failed_at_sample,
        failures,
        curve_count: processor.curve_count(),
        trajectory: processor.trajectory_rows(),
    };
    info!(
        run_id = %report.run_id,
        samples = report.samples_processed,
        passed = report.passed,
        "trial finished"
    );

    Ok(serde_json::to_string(&report)?)
}

/// Stateful processor for one trial at a time.
///
/// Use this when samples arrive one by one from a live host loop.
pub struct TrialProcessor {
    validators: Vec<Box<dyn Validator>>,
    curves: Option<CurveDetector>,
    tracker: TrajectoryTracker,
    trial: u32,
    samples_processed: usize,
}

impl Default for TrialProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialProcessor {
    /// Create a processor without validators
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
            curves: None,
            tracker: TrajectoryTracker::default(),
            trial: 0,
            samples_processed: 0,
        }
    }

    /// Create a processor with every component the configuration describes
    pub fn from_config(config: &TrialConfig) -> Result<Self, MotionError> {
        config.validate()?;
        Ok(Self {
            validators: config.build_validators()?,
            curves: config.build_curve_detector()?,
            tracker: TrajectoryTracker::new(config.track_trajectory),
            trial: 0,
            samples_processed: 0,
        })
    }

    /// Append a validator; validators run in insertion order
    pub fn add_validator(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn set_curve_detector(&mut self, curves: Option<CurveDetector>) {
        self.curves = curves;
    }

    pub fn set_tracking_active(&mut self, active: bool) {
        self.tracker.set_tracking_active(active);
    }

    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Look up a validator by its instance name
    pub fn validator_mut(&mut self, name: &str) -> Option<&mut Box<dyn Validator>> {
        self.validators.iter_mut().find(|v| v.name() == name)
    }

    pub fn curves(&self) -> Option<&CurveDetector> {
        self.curves.as_ref()
    }

    pub fn curve_count(&self) -> Option<usize> {
        self.curves.as_ref().map(CurveDetector::n_curves)
    }

    pub fn tracker(&self) -> &TrajectoryTracker {
        &self.tracker
    }

    /// Number of the current trial, starting at 1 after the first `start_trial`
    pub fn trial(&self) -> u32 {
        self.trial
    }

    pub fn samples_processed(&self) -> usize {
        self.samples_processed
    }

    /// Recorded path of the current trial
    pub fn trajectory_rows(&self) -> Vec<TrackedRow> {
        self.tracker.rows(self.trial)
    }

    /// Reset every component for a new trial starting at `time0`
    pub fn start_trial(&mut self, time0: Option<f64>) {
        for validator in &mut self.validators {
            validator.reset(time0);
        }
        if let Some(curves) = &mut self.curves {
            curves.reset(time0);
        }
        self.tracker.reset(None);
        self.trial += 1;
        self.samples_processed = 0;
        debug!(trial = self.trial, ?time0, "trial started");
    }

    /// Validate one sample against every validator.
    ///
    /// All validators see the sample even when an earlier one fails; a
    /// sequencing or state error aborts the call. Components that ran before
    /// the error keep the sample, so restart with [`Self::start_trial`] after
    /// an `Err`.
    pub fn process_sample(&mut self, sample: Sample) -> Result<SampleOutcome, MotionError> {
        let Sample { x, y, t } = sample;

        let mut failures = Vec::new();
        for validator in &mut self.validators {
            if let Err(failure) = validator.check_xyt(x, y, t)? {
                failures.push(failure);
            }
        }
        if let Some(curves) = &mut self.curves {
            curves.update_xyt(x, y, t)?;
        }
        self.tracker.track(x, y, t)?;

        let sample_index = self.samples_processed;
        self.samples_processed += 1;

        if !failures.is_empty() {
            debug!(sample_index, t, failures = failures.len(), "sample failed validation");
        }

        Ok(SampleOutcome {
            sample_index,
            t,
            failures,
            curve_count: self.curve_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FailureKind;
    use crate::validators::{SpeedValidator, SpeedValidatorConfig};
    use crate::types::Axis;

    fn speed_config_json() -> &'static str {
        r#"{
            "speed": { "axis": "y", "min_speed": 1.0 },
            "curves": { "min_angle_change_per_curve": 45 }
        }"#
    }

    fn slowing_samples_json() -> &'static str {
        r#"[
            {"x": 0, "y": 0, "t": 0},
            {"x": 0, "y": 2, "t": 1},
            {"x": 0, "y": 3, "t": 2},
            {"x": 0, "y": 3.9, "t": 3},
            {"x": 0, "y": 10, "t": 4}
        ]"#
    }

    #[test]
    fn test_run_trial_stops_at_first_failure() {
        let result = run_trial(speed_config_json(), slowing_samples_json());
        assert!(result.is_ok());

        let report: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(report["producer"], "motion-flux");
        assert_eq!(report["passed"], false);
        assert_eq!(report["failed_at_sample"], 3);
        assert_eq!(report["samples_processed"], 4);
        assert_eq!(report["failures"][0]["kind"], "too_slow");
        assert_eq!(report["failures"][0]["validator"], "speed");
        assert_eq!(report["curve_count"], 0);
        assert!(report.get("trajectory").is_none());
    }

    #[test]
    fn test_run_trial_passing() {
        let samples = r#"[
            {"x": 0, "y": 0, "t": 0},
            {"x": 0, "y": 5, "t": 1},
            {"x": 0, "y": 10, "t": 2}
        ]"#;
        let result = run_trial(speed_config_json(), samples).unwrap();

        let report: TrialReport = serde_json::from_str(&result).unwrap();
        assert!(report.passed);
        assert_eq!(report.failed_at_sample, None);
        assert_eq!(report.samples_processed, 3);
        assert!(Uuid::parse_str(&report.run_id).is_ok());
    }

    #[test]
    fn test_run_trial_records_trajectory() {
        let config = r#"{ "track_trajectory": true }"#;
        let samples = r#"[{"x": 1, "y": 2, "t": 0}, {"x": 3, "y": 4, "t": 0.5}]"#;
        let report: TrialReport = serde_json::from_str(&run_trial(config, samples).unwrap()).unwrap();

        assert_eq!(report.trajectory.len(), 2);
        assert_eq!(report.trajectory[1].trial, 1);
        assert_eq!(report.trajectory[1].x, 3.0);
        assert_eq!(report.curve_count, None);
    }

    #[test]
    fn test_run_trial_out_of_order_is_an_error() {
        let samples = r#"[{"x": 0, "y": 0, "t": 1}, {"x": 0, "y": 1, "t": 0.5}]"#;
        let result = run_trial(speed_config_json(), samples);
        assert!(matches!(result, Err(ref e) if e.is_sequencing_error()));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            run_trial("{", "[]"),
            Err(MotionError::JsonError(_))
        ));
        assert!(matches!(
            run_trial("{}", r#"[{"x": 0}]"#),
            Err(MotionError::JsonError(_))
        ));
    }

    #[test]
    fn test_processor_collects_every_failure() {
        let mut processor = TrialProcessor::new();
        for (name, axis) in [("vertical", Axis::Y), ("horizontal", Axis::X)] {
            let validator = SpeedValidator::new(
                1.0,
                SpeedValidatorConfig {
                    name: name.to_string(),
                    axis,
                    max_speed: Some(1.0),
                    ..Default::default()
                },
            )
            .unwrap();
            processor.add_validator(Box::new(validator));
        }
        assert_eq!(processor.validator_names(), vec!["vertical", "horizontal"]);

        processor.start_trial(Some(0.0));
        assert!(processor.process_sample(Sample::new(0.0, 0.0, 0.0)).unwrap().passed());

        let outcome = processor.process_sample(Sample::new(5.0, 5.0, 1.0)).unwrap();
        assert_eq!(outcome.sample_index, 1);
        let validators: Vec<&str> = outcome.failures.iter().map(|f| f.validator.as_str()).collect();
        assert_eq!(validators, vec!["vertical", "horizontal"]);
        assert!(outcome.failures.iter().all(|f| f.kind == FailureKind::TooFast));
    }

    #[test]
    fn test_disabling_a_validator_by_name() {
        let config = TrialConfig::from_json(r#"{ "speed": { "axis": "y", "min_speed": 1.0 } }"#).unwrap();
        let mut processor = TrialProcessor::from_config(&config).unwrap();
        processor.validator_mut("speed").unwrap().set_enabled(false);
        assert!(processor.validator_mut("missing").is_none());

        processor.start_trial(Some(0.0));
        for t in 0..5 {
            let outcome = processor.process_sample(Sample::new(0.0, 0.0, t as f64)).unwrap();
            assert!(outcome.passed());
        }
    }

    #[test]
    fn test_start_trial_resets_state() {
        let config = TrialConfig::from_json(r#"{ "track_trajectory": true }"#).unwrap();
        let mut processor = TrialProcessor::from_config(&config).unwrap();

        processor.start_trial(None);
        processor.process_sample(Sample::new(0.0, 0.0, 0.0)).unwrap();
        processor.process_sample(Sample::new(1.0, 0.0, 1.0)).unwrap();
        assert_eq!(processor.samples_processed(), 2);

        processor.start_trial(None);
        assert_eq!(processor.trial(), 2);
        assert_eq!(processor.samples_processed(), 0);
        assert!(processor.tracker().is_empty());

        // earlier timestamps are fine in a new trial
        processor.process_sample(Sample::new(0.0, 0.0, 0.5)).unwrap();
        assert_eq!(processor.trajectory_rows()[0].trial, 2);
    }

    #[test]
    fn test_start_trial_recovers_after_an_error() {
        let config = TrialConfig::from_json(speed_config_json()).unwrap();
        let mut processor = TrialProcessor::from_config(&config).unwrap();

        processor.start_trial(Some(0.0));
        processor.process_sample(Sample::new(0.0, 0.0, 0.0)).unwrap();
        processor.process_sample(Sample::new(0.0, 2.0, 1.0)).unwrap();

        let err = processor.process_sample(Sample::new(0.0, 3.0, 0.5)).unwrap_err();
        assert!(matches!(err, MotionError::OutOfOrderTime { .. }));
        assert_eq!(processor.samples_processed(), 2);

        processor.start_trial(Some(0.0));
        processor.process_sample(Sample::new(0.0, 0.0, 0.0)).unwrap();
        let outcome = processor.process_sample(Sample::new(0.0, 2.0, 1.0)).unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.sample_index, 1);
    }
}
