//! Motion Flux - Real-time kinematic monitoring and movement validation
//!
//! Flux watches a stream of timestamped pointer/finger positions during a
//! trial and decides, sample by sample, whether the movement obeys the
//! configured policies: speed bounds, direction ranges, a target speed
//! profile, allowed screen regions and colour gradients. It can also count
//! direction reversals and generate target trajectories to follow.
//!
//! ## Modules
//!
//! - **Kinematics**: [`window`], [`monitor`] and [`curves`] derive speed,
//!   direction and curve counts from raw samples
//! - **Validation**: [`validators`] turn each sample into a [`Validation`]
//! - **Stimulus**: [`trajectory`] produces target positions over time
//! - **Host loop**: [`pipeline`] and [`ffi`] drive a whole trial

pub mod colormap;
pub mod config;
pub mod curves;
pub mod error;
pub mod geometry;
pub mod monitor;
pub mod pipeline;
pub mod shapes;
pub mod tracker;
pub mod trajectory;
pub mod types;
pub mod validation;
pub mod validators;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::TrialConfig;
pub use curves::{CurveDetector, CurveDirection};
pub use error::MotionError;
pub use monitor::MovementMonitor;
pub use pipeline::{run_trial, SampleOutcome, TrialProcessor, TrialReport};
pub use types::{AngleUnits, Axis, Rgb, Sample};
pub use validation::{FailureKind, Validation, ValidationFailure};
pub use validators::Validator;
pub use window::{SampleWindow, WindowSpan};

// Trajectory exports
pub use trajectory::{
    CircularTrajectoryGenerator, CustomTrajectoryGenerator, TrajectoryGenerator, TrajectoryPoint,
};

/// Library version embedded in every trial report
pub const MFLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for trial reports
pub const PRODUCER_NAME: &str = "motion-flux";
