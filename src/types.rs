//! Core data types
//!
//! Samples, axis/angle enums and colour values shared by every monitor and
//! validator.

use serde::{Deserialize, Serialize};

/// One pointer/finger observation: coordinates plus time in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    /// Squared Euclidean distance to another sample (time ignored)
    pub fn distance_sq(&self, other: &Sample) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// True when both samples sit on the same spatial point
    pub fn same_position(&self, other: &Sample) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// Spatial component(s) used by a speed or distance computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    #[default]
    Y,
    /// Euclidean distance over both axes
    XY,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::XY => "xy",
        }
    }
}

/// Unit in which angles are configured and reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnits {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnits {
    /// Size of a full turn in these units
    pub fn full_turn(&self) -> f64 {
        match self {
            AngleUnits::Degrees => 360.0,
            AngleUnits::Radians => std::f64::consts::TAU,
        }
    }

    /// Convert a radian value into these units
    pub fn from_radians(&self, radians: f64) -> f64 {
        match self {
            AngleUnits::Degrees => radians.to_degrees(),
            AngleUnits::Radians => radians,
        }
    }
}

/// Numeric colour code (0..=0xFFFFFF for RGB-mapped images)
pub type ColorCode = u32;

/// 8-bit RGB triplet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Pack into a single 24-bit code
    pub fn to_code(self) -> ColorCode {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }

    /// Unpack a 24-bit code; `None` if the value does not fit in 24 bits
    pub fn from_code(code: ColorCode) -> Option<Self> {
        if code > 0xFF_FFFF {
            return None;
        }
        Some(Rgb((code >> 16) as u8, (code >> 8) as u8, code as u8))
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from(value: (u8, u8, u8)) -> Self {
        Rgb(value.0, value.1, value.2)
    }
}

/// A colour given either as an RGB triplet or as an already-packed code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Rgb(Rgb),
    Code(ColorCode),
}

impl ColorSpec {
    pub fn to_code(self) -> ColorCode {
        match self {
            ColorSpec::Rgb(rgb) => rgb.to_code(),
            ColorSpec::Code(code) => code,
        }
    }
}

impl From<Rgb> for ColorSpec {
    fn from(value: Rgb) -> Self {
        ColorSpec::Rgb(value)
    }
}

impl From<ColorCode> for ColorSpec {
    fn from(value: ColorCode) -> Self {
        ColorSpec::Code(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_code_packing() {
        assert_eq!(Rgb(0, 0, 0).to_code(), 0);
        assert_eq!(Rgb(255, 255, 255).to_code(), 0xFF_FFFF);
        assert_eq!(Rgb(1, 2, 3).to_code(), 0x01_0203);
        assert_eq!(Rgb::from_code(0x01_0203), Some(Rgb(1, 2, 3)));
        assert_eq!(Rgb::from_code(0x100_0000), None);
    }

    #[test]
    fn test_color_spec_deserialize() {
        let specs: Vec<ColorSpec> = serde_json::from_str("[[0, 0, 50], 50]").unwrap();
        assert_eq!(specs[0].to_code(), 50);
        assert_eq!(specs[1].to_code(), 50);
    }

    #[test]
    fn test_axis_serde() {
        let axis: Axis = serde_json::from_str("\"xy\"").unwrap();
        assert_eq!(axis, Axis::XY);
        assert_eq!(Axis::default(), Axis::Y);
    }
}
