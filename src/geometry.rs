//! Geometry helpers shared by the kinematic components
//!
//! Angle convention throughout the crate: 0 = straight up (positive y),
//! angles grow clockwise up to a full turn.

use crate::types::{Axis, Sample};
use std::f64::consts::{FRAC_PI_2, PI};

/// Direction of movement from `from` to `to`, in radians within `[0, 2π)`.
///
/// A purely vertical displacement snaps to 0 (upwards) or π (downwards).
pub fn movement_angle(from: &Sample, to: &Sample) -> f64 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;

    if dx == 0.0 {
        if dy > 0.0 {
            0.0
        } else {
            PI
        }
    } else if dx > 0.0 {
        // rightwards: (0, π)
        (-dy / dx).atan() + FRAC_PI_2
    } else {
        // leftwards: (π, 2π)
        (-dy / dx).atan() + 3.0 * FRAC_PI_2
    }
}

/// Displacement between two samples projected on an axis.
///
/// X and Y are signed; XY is the (unsigned) Euclidean distance.
pub fn axis_displacement(axis: Axis, from: &Sample, to: &Sample) -> f64 {
    match axis {
        Axis::X => to.x - from.x,
        Axis::Y => to.y - from.y,
        Axis::XY => from.distance_sq(to).sqrt(),
    }
}

/// Length of the shorter arc covered by an angular change
pub fn short_arc(delta: f64, full_turn: f64) -> f64 {
    let d = delta.rem_euclid(full_turn);
    d.min(full_turn - d)
}

/// Normalise an angle into `[0, full_turn)`
pub fn normalize_angle(angle: f64, full_turn: f64) -> f64 {
    let a = angle.rem_euclid(full_turn);
    // rem_euclid can round up to exactly full_turn for tiny negative inputs
    if a >= full_turn {
        0.0
    } else {
        a
    }
}

/// Whether `angle` lies on the clockwise arc from `min` to `max`, bounds included.
///
/// All three values must already be normalised to the same `[0, full_turn)` range.
/// When `min > max` the arc wraps through zero, so the invalid zone is the open
/// arc `(max, min)`.
pub fn angle_in_range(angle: f64, min: f64, max: f64) -> bool {
    if min <= max {
        min <= angle && angle <= max
    } else {
        !(max < angle && angle < min)
    }
}

/// Rotate a point about the origin; positive degrees rotate clockwise
pub fn rotate_coord(point: (f64, f64), degrees: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (x, y) = point;
    (x * cos + y * sin, y * cos - x * sin)
}
