//! Rectangle shape.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Rgba, ShapeId, Stroke, fill_from_value, fill_value};
use crate::fields::{FieldKey, FieldValue};

/// An axis-aligned rectangle, optionally rotated around its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
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

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
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
            FieldKey::Width => Some(self.width.into()),
            FieldKey::Height => Some(self.height.into()),
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
            (FieldKey::Width, FieldValue::Number(n)) => self.width = *n,
            (FieldKey::Height, FieldValue::Number(n)) => self.height = *n,
            (FieldKey::Rotation, FieldValue::Number(n)) => self.rotation = *n,
            (FieldKey::Fill, FieldValue::Color(c)) => self.fill = fill_from_value(*c),
            (FieldKey::Stroke, FieldValue::Color(c)) => self.stroke.color = *c,
            (FieldKey::StrokeWidth, FieldValue::Number(n)) => self.stroke.width = *n,
            _ => return false,
        }
        true
    }
}
