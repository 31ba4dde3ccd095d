//! Text shape.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Rgba, ShapeId};
use crate::fields::{FieldKey, FieldValue};

fn default_font_size() -> f64 {
    16.0
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

/// A text label anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Anchor position.
    pub position: Point,
    pub content: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Rotation in degrees, kept in `[0, 360)`.
    #[serde(default)]
    pub rotation: f64,
    /// Text color.
    pub fill: Rgba,
    #[serde(default)]
    pub last_modified_by: Option<String>,
    #[serde(default)]
    pub last_modified: u64,
}

impl Text {
    /// Create a new text label.
    pub fn new(position: Point, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content: content.into(),
            font_size: default_font_size(),
            font_family: default_font_family(),
            rotation: 0.0,
            fill: Rgba::black(),
            last_modified_by: None,
            last_modified: 0,
        }
    }

    pub(crate) fn field(&self, key: FieldKey) -> Option<FieldValue> {
        match key {
            FieldKey::X => Some(self.position.x.into()),
            FieldKey::Y => Some(self.position.y.into()),
            FieldKey::Rotation => Some(self.rotation.into()),
            FieldKey::Fill => Some(self.fill.into()),
            FieldKey::FontSize => Some(self.font_size.into()),
            FieldKey::FontFamily => Some(self.font_family.as_str().into()),
            FieldKey::Content => Some(self.content.as_str().into()),
            _ => None,
        }
    }

    pub(crate) fn set_field(&mut self, key: FieldKey, value: &FieldValue) -> bool {
        match (key, value) {
            (FieldKey::X, FieldValue::Number(n)) => self.position.x = *n,
            (FieldKey::Y, FieldValue::Number(n)) => self.position.y = *n,
            (FieldKey::Rotation, FieldValue::Number(n)) => self.rotation = *n,
            (FieldKey::Fill, FieldValue::Color(c)) => self.fill = *c,
            (FieldKey::FontSize, FieldValue::Number(n)) => self.font_size = *n,
            (FieldKey::FontFamily, FieldValue::Text(s)) => self.font_family = s.clone(),
            (FieldKey::Content, FieldValue::Text(s)) => self.content = s.clone(),
            _ => return false,
        }
        true
    }
}
