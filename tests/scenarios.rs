//! End-to-end trial scenarios and behavioural properties

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

use motion_flux::colormap::{ColorMapping, LocationColorMap};
use motion_flux::geometry::angle_in_range;
use motion_flux::trajectory::{CustomTrajectoryGenerator, TimePoint};
use motion_flux::validators::{
    DirectionValidator, DirectionValidatorConfig, GlobalSpeedValidator,
    GlobalSpeedValidatorConfig, GradientValidator, GradientValidatorConfig, Section,
    SpeedValidator, SpeedValidatorConfig,
};
use motion_flux::{
    run_trial, AngleUnits, Axis, CurveDetector, FailureKind, MovementMonitor, Rgb, TrajectoryGenerator,
    TrajectoryPoint, Validator, WindowSpan,
};

fn gradient_image() -> Vec<Vec<Rgb>> {
    vec![(0..100).map(|i| Rgb(0, 0, i as u8)).collect()]
}

#[test]
fn speed_trial_fails_when_the_pointer_slows_down() {
    let mut v = SpeedValidator::new(
        1.0,
        SpeedValidatorConfig {
            axis: Axis::Y,
            min_speed: Some(1.0),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(v.check_xyt(0.0, 0.0, 0.0).unwrap().is_ok());
    assert!(v.check_xyt(0.0, 2.0, 1.0).unwrap().is_ok());
    assert!(v.check_xyt(0.0, 3.0, 2.0).unwrap().is_ok());

    let failure = v.check_xyt(0.0, 3.9, 3.0).unwrap().unwrap_err();
    assert_eq!(failure.kind, FailureKind::TooSlow);
    assert_abs_diff_eq!(failure.detail_f64("speed").unwrap(), 0.9, epsilon = 1e-9);
}

#[test]
fn global_speed_trial_passes_on_profile_and_fails_behind_it() {
    let mut v = GlobalSpeedValidator::new(GlobalSpeedValidatorConfig {
        origin_coord: Some(0.0),
        end_coord: Some(100.0),
        max_trial_duration: Some(1.0),
        ..Default::default()
    })
    .unwrap();

    v.reset(Some(0.0));
    assert!(v.check_xyt(0.0, 50.0, 0.5).unwrap().is_ok());
    assert!(v.check_xyt(0.0, 100.0, 1.0).unwrap().is_ok());

    v.reset(Some(0.0));
    let failure = v.check_xyt(0.0, 49.0, 0.5).unwrap().unwrap_err();
    assert_eq!(failure.kind, FailureKind::TooSlow);
    assert_eq!(failure.detail_f64("expected_coord"), Some(50.0));
    assert_eq!(failure.detail_f64("actual_coord"), Some(49.0));
}

#[test]
fn gradient_trial_rejects_a_one_step_regression() {
    let map = LocationColorMap::new(gradient_image(), (49, 0), ColorMapping::Rgb).unwrap();
    let mut v = GradientValidator::new(Arc::new(map), GradientValidatorConfig::default()).unwrap();

    assert!(v.check_xyt(0.0, 0.0, 0.0).unwrap().is_ok());
    assert!(v.check_xyt(10.0, 0.0, 0.1).unwrap().is_ok());

    let failure = v.check_xyt(9.0, 0.0, 0.2).unwrap().unwrap_err();
    assert_eq!(failure.kind, FailureKind::GradientViolation);
}

#[test]
fn gradient_trial_through_the_json_pipeline() {
    let image: Vec<serde_json::Value> = (0..100).map(|i| serde_json::json!([0, 0, i])).collect();
    let config = serde_json::json!({
        "gradient": { "map": { "image": [image], "position": [49, 0] } }
    });
    let samples = r#"[
        {"x": 0, "y": 0, "t": 0},
        {"x": 10, "y": 0, "t": 0.1},
        {"x": 9, "y": 0, "t": 0.2}
    ]"#;

    let report: serde_json::Value =
        serde_json::from_str(&run_trial(&config.to_string(), samples).unwrap()).unwrap();
    assert_eq!(report["passed"], false);
    assert_eq!(report["failed_at_sample"], 2);
    assert_eq!(report["failures"][0]["kind"], "gradient_violation");
    assert_eq!(report["failures"][0]["details"]["color"], 9);
}

#[test]
fn disabled_validators_always_pass() {
    let mut validators: Vec<Box<dyn Validator>> = vec![
        Box::new(
            SpeedValidator::new(
                1.0,
                SpeedValidatorConfig {
                    min_speed: Some(100.0),
                    max_speed: Some(101.0),
                    ..Default::default()
                },
            )
            .unwrap(),
        ),
        Box::new(
            DirectionValidator::new(
                1.0,
                DirectionValidatorConfig {
                    min_angle: Some(10.0),
                    max_angle: Some(20.0),
                    ..Default::default()
                },
            )
            .unwrap(),
        ),
        // uninitialised on purpose: disabled wins over the missing fields
        Box::new(GlobalSpeedValidator::new(GlobalSpeedValidatorConfig::default()).unwrap()),
    ];

    for v in &mut validators {
        v.set_enabled(false);
        v.reset(Some(0.0));
        for step in 0..50 {
            let t = step as f64 * 0.1;
            let (x, y) = ((step * 37 % 11) as f64, (step * 13 % 7) as f64 - 3.0);
            assert!(v.check_xyt(x, y, t).unwrap().is_ok(), "{} failed at t={t}", v.name());
        }
    }
}

#[test]
fn speed_is_distance_over_time_in_millimetres() {
    for units_per_mm in [1.0, 2.5, 10.0] {
        let mut monitor = MovementMonitor::new(units_per_mm, WindowSpan::Duration(0.0)).unwrap();
        monitor.update_xyt(0.0, 0.0, 1.0).unwrap();
        // 30 mm to the right and 40 mm up, in caller units, over 2 seconds
        monitor
            .update_xyt(30.0 * units_per_mm, 40.0 * units_per_mm, 3.0)
            .unwrap();

        assert_abs_diff_eq!(monitor.xy_speed().unwrap(), 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(monitor.x_speed().unwrap(), 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(monitor.y_speed().unwrap(), 20.0, epsilon = 1e-9);
    }
}

#[test]
fn direction_bounds_are_inclusive() {
    // moving straight up is exactly 0 degrees
    for (min_angle, max_angle) in [(0.0, 90.0), (-90.0, 0.0), (270.0, 0.0)] {
        let mut v = DirectionValidator::new(
            1.0,
            DirectionValidatorConfig {
                min_angle: Some(min_angle),
                max_angle: Some(max_angle),
                ..Default::default()
            },
        )
        .unwrap();
        v.reset(Some(0.0));
        assert!(v.check_xyt(0.0, 0.0, 0.0).unwrap().is_ok());
        assert!(
            v.check_xyt(0.0, 5.0, 1.0).unwrap().is_ok(),
            "range [{min_angle}, {max_angle}] rejected its own bound"
        );
    }
}

#[test]
fn wrapped_direction_range_rejects_exactly_the_open_arc() {
    let (min, max) = (300.0, 60.0);
    for step in 0..720 {
        let angle = step as f64 * 0.5;
        let invalid = angle > max && angle < min;
        assert_eq!(angle_in_range(angle, min, max), !invalid, "angle {angle}");
    }
}

#[test]
fn expected_coordinate_hits_both_endpoints() {
    let section_sets = vec![
        vec![Section::new(1.0, 1.0)],
        vec![Section::new(0.25, 0.5), Section::new(0.75, 0.5)],
        vec![
            Section::new(0.1, 0.3),
            Section::new(0.6, 0.2),
            Section::new(0.3, 0.5),
        ],
    ];

    for sections in section_sets {
        let v = GlobalSpeedValidator::new(GlobalSpeedValidatorConfig {
            origin_coord: Some(-20.0),
            end_coord: Some(80.0),
            max_trial_duration: Some(3.0),
            sections,
            ..Default::default()
        })
        .unwrap();

        assert_abs_diff_eq!(v.get_expected_coord_at_time(0.0).unwrap(), -20.0);
        assert_eq!(v.get_expected_coord_at_time(3.0).unwrap(), 80.0);
    }
}

fn line_trajectory(cyclic: bool) -> CustomTrajectoryGenerator {
    let mut g = CustomTrajectoryGenerator::new(cyclic, true);
    g.set_trajectory(
        "line",
        vec![
            TimePoint::new(0.0, 0, 0),
            TimePoint::new(1.0, 100, 0),
            TimePoint::new(2.0, 100, 50),
        ],
    )
    .unwrap();
    g
}

#[test]
fn non_cyclic_trajectory_holds_its_last_point() {
    let mut g = line_trajectory(false);
    for t in [2.0, 2.01, 5.0, 1000.0] {
        assert_eq!(g.get_traj_point(t).unwrap(), TrajectoryPoint::new(100, 50, true));
    }
}

#[test]
fn cyclic_trajectory_wraps_after_its_duration() {
    let mut g = line_trajectory(true);
    for eps in [0.25, 0.5, 1.5] {
        let early = g.get_traj_point(eps).unwrap();
        let wrapped = g.get_traj_point(2.0 + eps).unwrap();
        assert_eq!(wrapped, early, "eps {eps}");
    }
}

#[test]
fn curve_count_follows_threshold_oscillations() {
    let mut at_threshold =
        CurveDetector::new(1.0, 0.0, AngleUnits::Degrees, 0.0, 15.0).unwrap();
    for angle in [0.0, 15.0, 0.0, 15.0, 0.0] {
        at_threshold.push_angle(Some(angle));
    }
    // every reversal is a curve: one full 0 -> 15 -> 0 oscillation is two curves,
    // so two oscillations give four
    assert_eq!(at_threshold.n_curves(), 4);

    let mut below = CurveDetector::new(1.0, 0.0, AngleUnits::Degrees, 0.0, 15.0).unwrap();
    for _ in 0..10 {
        below.push_angle(Some(0.0));
        below.push_angle(Some(14.9));
    }
    assert_eq!(below.n_curves(), 0);
}
