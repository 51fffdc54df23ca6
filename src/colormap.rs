//! Position → colour lookup
//!
//! Validators that depend on where the pointer is only need [`ColorLookup`].
//! [`LocationColorMap`] is the stock implementation over an already decoded
//! image; decoding image files is left to the caller.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::MotionError;
use crate::types::{ColorCode, Rgb};

const COMPONENT: &str = "LocationColorMap";

/// Anything that can tell the colour code at an integer coordinate
pub trait ColorLookup {
    /// `None` when the coordinate lies outside the mapped area
    fn color_at(&self, x: i32, y: i32) -> Option<ColorCode>;
}

impl<T: ColorLookup + ?Sized> ColorLookup for &T {
    fn color_at(&self, x: i32, y: i32) -> Option<ColorCode> {
        (**self).color_at(x, y)
    }
}

impl<T: ColorLookup + ?Sized> ColorLookup for Rc<T> {
    fn color_at(&self, x: i32, y: i32) -> Option<ColorCode> {
        (**self).color_at(x, y)
    }
}

impl<T: ColorLookup + ?Sized> ColorLookup for Arc<T> {
    fn color_at(&self, x: i32, y: i32) -> Option<ColorCode> {
        (**self).color_at(x, y)
    }
}

impl<T: ColorLookup + ?Sized> ColorLookup for Box<T> {
    fn color_at(&self, x: i32, y: i32) -> Option<ColorCode> {
        (**self).color_at(x, y)
    }
}

/// Adapter turning a closure into a [`ColorLookup`]
pub struct LookupFn<F>(pub F);

impl<F> ColorLookup for LookupFn<F>
where
    F: Fn(i32, i32) -> Option<ColorCode>,
{
    fn color_at(&self, x: i32, y: i32) -> Option<ColorCode> {
        (self.0)(x, y)
    }
}

/// How image colours are translated into codes
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColorMapping {
    /// 24-bit RGB value
    #[default]
    Rgb,
    /// 0, 1, 2, ... by ascending RGB value of the colours present in the image
    Indexed,
    /// Explicit table; must cover every colour of the image
    Custom(HashMap<Rgb, ColorCode>),
}

/// Decoded image placed on the coordinate plane by its centre
#[derive(Debug, Clone)]
pub struct LocationColorMap {
    image: Vec<Vec<Rgb>>,
    width: i32,
    height: i32,
    position: (i32, i32),
    top_left: (i32, i32),
    available: BTreeSet<Rgb>,
    codes: HashMap<Rgb, ColorCode>,
}

impl LocationColorMap {
    /// `image[row][col]`; row 0 holds the smallest y coordinate
    pub fn new(
        image: Vec<Vec<Rgb>>,
        position: (i32, i32),
        mapping: ColorMapping,
    ) -> Result<Self, MotionError> {
        let height = image.len();
        let width = image.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(MotionError::config(COMPONENT, "image must not be empty"));
        }
        if let Some(row) = image.iter().position(|r| r.len() != width) {
            return Err(MotionError::config(
                COMPONENT,
                format!("image must be rectangular; row {row} has a different width"),
            ));
        }
        let (Ok(width), Ok(height)) = (i32::try_from(width), i32::try_from(height)) else {
            return Err(MotionError::config(COMPONENT, "image is too large"));
        };

        let available: BTreeSet<Rgb> = image.iter().flatten().copied().collect();

        let mut map = Self {
            image,
            width,
            height,
            position,
            top_left: (0, 0),
            available,
            codes: HashMap::new(),
        };
        map.set_position(position);
        map.set_mapping(mapping)?;
        Ok(map)
    }

    /// Move the image so that its middle pixel sits on `position`
    pub fn set_position(&mut self, position: (i32, i32)) {
        self.position = position;
        self.top_left = (
            position.0 - (self.width - 1) / 2,
            position.1 - (self.height - 1) / 2,
        );
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn set_mapping(&mut self, mapping: ColorMapping) -> Result<(), MotionError> {
        self.codes = match mapping {
            ColorMapping::Rgb => self.available.iter().map(|c| (*c, c.to_code())).collect(),
            ColorMapping::Indexed => self
                .available
                .iter()
                .zip(0..)
                .map(|(c, i)| (*c, i))
                .collect(),
            ColorMapping::Custom(table) => {
                let missing: Vec<String> = self
                    .available
                    .iter()
                    .filter(|c| !table.contains_key(c))
                    .map(|c| format!("({},{},{})", c.0, c.1, c.2))
                    .collect();
                if !missing.is_empty() {
                    return Err(MotionError::config(
                        COMPONENT,
                        format!("colour mapping is missing colours {}", missing.join(", ")),
                    ));
                }
                table
            }
        };
        Ok(())
    }

    /// All colours that appear in the image
    pub fn available_colors(&self) -> &BTreeSet<Rgb> {
        &self.available
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Raw pixel colour at a coordinate
    pub fn rgb_at(&self, x: i32, y: i32) -> Option<Rgb> {
        let col = x.checked_sub(self.top_left.0)?;
        let row = y.checked_sub(self.top_left.1)?;
        if col < 0 || row < 0 || col >= self.width || row >= self.height {
            return None;
        }
        self.image
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
    }
}

impl ColorLookup for LocationColorMap {
    fn color_at(&self, x: i32, y: i32) -> Option<ColorCode> {
        self.rgb_at(x, y).and_then(|c| self.codes.get(&c).copied())
    }
}
