//! Shape map: which logical region contains a coordinate

use serde::{Deserialize, Serialize};

use crate::error::MotionError;
use crate::geometry::rotate_coord;

/// Closed set of region shapes, in shape-map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned rectangle from `(x, y)` spanning `width` x `height`, edges included
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Circle { x: f64, y: f64, radius: f64 },
}

impl Shape {
    pub fn contains(&self, point: (f64, f64)) -> bool {
        let (px, py) = point;
        match *self {
            Shape::Rectangle {
                x,
                y,
                width,
                height,
            } => px >= x && px <= x + width && py >= y && py <= y + height,
            Shape::Circle { x, y, radius } => {
                let dx = px - x;
                let dy = py - y;
                (dx * dx + dy * dy).sqrt() <= radius
            }
        }
    }

    fn validate(&self) -> Result<(), MotionError> {
        let ok = match *self {
            Shape::Rectangle { width, height, .. } => width >= 0.0 && height >= 0.0,
            Shape::Circle { radius, .. } => radius >= 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(MotionError::config("ShapeMap", format!("invalid shape {self:?}")))
        }
    }
}

/// Ordered shapes sharing one position and rotation
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMap<Id = String> {
    position: (f64, f64),
    rotation: f64,
    shapes: Vec<(Shape, Id)>,
}

impl<Id> Default for ShapeMap<Id> {
    fn default() -> Self {
        Self::new((0.0, 0.0), 0.0)
    }
}

impl<Id> ShapeMap<Id> {
    /// `rotation` is in degrees, positive = clockwise
    pub fn new(position: (f64, f64), rotation: f64) -> Self {
        Self {
            position,
            rotation,
            shapes: Vec::new(),
        }
    }

    pub fn add_shape(&mut self, shape: Shape, id: Id) -> Result<(), MotionError> {
        shape.validate()?;
        self.shapes.push((shape, id));
        Ok(())
    }

    pub fn set_position(&mut self, position: (f64, f64)) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees;
    }

    pub fn shapes(&self) -> &[(Shape, Id)] {
        &self.shapes
    }

    /// First shape (in insertion order) containing the point
    pub fn get_shape_at(&self, x: f64, y: f64) -> Option<(&Shape, &Id)> {
        let local = rotate_coord((x - self.position.0, y - self.position.1), -self.rotation);
        self.shapes
            .iter()
            .find(|(shape, _)| shape.contains(local))
            .map(|(shape, id)| (shape, id))
    }

    /// Id of the first shape containing the point
    pub fn get_shape_id_at(&self, x: f64, y: f64) -> Option<&Id> {
        self.get_shape_at(x, y).map(|(_, id)| id)
    }
}
