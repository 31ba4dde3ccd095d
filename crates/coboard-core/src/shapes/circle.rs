//! Circle shape.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Rgba, ShapeId, Stroke, fill_from_value, fill_value};
use crate::fields::{FieldKey, FieldValue};

/// A circle described by its center and radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub(crate) id: ShapeId,
    /// Center position.
    pub position: Point,
    pub radius: f64,
    /// Rotation in degrees, kept in `[0, 360)`.
    #[serde(default)]
    pub rotation: f64,
    /// Fill color (None = no fill).
    #[serde(default)]
    pub fill: Option<Rgba>,
    #[serde(default)]
    pub stroke: Stroke,
    #[serde(default)]
    pub last_modified_by: Option<String>,
    #[serde(default)]
    pub last_modified: u64,
}

impl Circle {
    /// Create a new circle.
    pub fn new(position: Point, radius: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            radius,
            rotation: 0.0,
            fill: None,
            stroke: Stroke::default(),
            last_modified_by: None,
            last_modified: 0,
        }
    }

    pub(crate) fn field(&self, key: FieldKey) -> Option<FieldValue> {
        match key {
            FieldKey::X => Some(self.position.x.into()),
            FieldKey::Y => Some(self.position.y.into()),
            FieldKey::Radius => Some(self.radius.into()),
            FieldKey::Rotation => Some(self.rotation.into()),
            FieldKey::Fill => Some(fill_value(self.fill)),
            FieldKey::Stroke => Some(self.stroke.color.into()),
            FieldKey::StrokeWidth => Some(self.stroke.width.into()),
            _ => None,
        }
    }

    pub(crate) fn set_field(&mut self, key: FieldKey, value: &FieldValue) -> bool {
        match (key, value) {
            (FieldKey::X, FieldValue::Number(n)) => self.position.x = *n,
            (FieldKey::Y, FieldValue::Number(n)) => self.position.y = *n,
            (FieldKey::Radius, FieldValue::Number(n)) => self.radius = *n,
            (FieldKey::Rotation, FieldValue::Number(n)) => self.rotation = *n,
            (FieldKey::Fill, FieldValue::Color(c)) => self.fill = fill_from_value(*c),
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
    fn test_circle_fields() {
        let mut circle = Circle::new(Point::new(50.0, 60.0), 25.0);
        assert_eq!(circle.field(FieldKey::Radius), Some(FieldValue::Number(25.0)));
        assert_eq!(circle.field(FieldKey::Width), None);

        assert!(circle.set_field(FieldKey::Radius, &FieldValue::Number(40.0)));
        assert!((circle.radius - 40.0).abs() < f64::EPSILON);
    }
}
