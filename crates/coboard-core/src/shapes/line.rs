//! Line shape.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ShapeId, Stroke};
use crate::fields::{FieldKey, FieldValue};

/// A straight line from `position` to `position + extent`.
///
/// Storing the far endpoint as an extent vector lets the line share the
/// position (`x`/`y`) and size (`width`/`height`) field algebra: moving
/// translates the origin, resizing scales the extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub(crate) id: ShapeId,
    /// Starting point.
    pub position: Point,
    /// Vector from the start to the end point.
    pub extent: Vec2,
    #[serde(default)]
    pub stroke: Stroke,
    #[serde(default)]
    pub last_modified_by: Option<String>,
    #[serde(default)]
    pub last_modified: u64,
}

impl Line {
    /// Create a new line between two points.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: start,
            extent: end - start,
            stroke: Stroke::default(),
            last_modified_by: None,
            last_modified: 0,
        }
    }

    /// The far endpoint in canvas coordinates.
    pub fn end(&self) -> Point {
        self.position + self.extent
    }

    pub(crate) fn field(&self, key: FieldKey) -> Option<FieldValue> {
        match key {
            FieldKey::X => Some(self.position.x.into()),
            FieldKey::Y => Some(self.position.y.into()),
            FieldKey::Width => Some(self.extent.x.into()),
            FieldKey::Height => Some(self.extent.y.into()),
            FieldKey::Stroke => Some(self.stroke.color.into()),
            FieldKey::StrokeWidth => Some(self.stroke.width.into()),
            _ => None,
        }
    }

    pub(crate) fn set_field(&mut self, key: FieldKey, value: &FieldValue) -> bool {
        match (key, value) {
            (FieldKey::X, FieldValue::Number(n)) => self.position.x = *n,
            (FieldKey::Y, FieldValue::Number(n)) => self.position.y = *n,
            (FieldKey::Width, FieldValue::Number(n)) => self.extent.x = *n,
            (FieldKey::Height, FieldValue::Number(n)) => self.extent.y = *n,
            (FieldKey::Stroke, FieldValue::Color(c)) => self.stroke.color = *c,
            (FieldKey::StrokeWidth, FieldValue::Number(n)) => self.stroke.width = *n,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endpoints() {
        let line = Line::new(Point::new(10.0, 10.0), Point::new(40.0, 50.0));
        assert!((line.extent.x - 30.0).abs() < f64::EPSILON);
        assert!((line.extent.y - 40.0).abs() < f64::EPSILON);
        assert_eq!(line.end(), Point::new(40.0, 50.0));
    }

    #[test]
    fn test_line_has_no_fill_or_rotation() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        assert_eq!(line.field(FieldKey::Fill), None);
        assert_eq!(line.field(FieldKey::Rotation), None);
    }
}
