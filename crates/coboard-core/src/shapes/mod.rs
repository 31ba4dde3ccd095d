//! Shape definitions for the shared canvas.

mod circle;
mod line;
mod rectangle;
mod text;

pub use circle::Circle;
pub use line::Line;
pub use rectangle::Rectangle;
pub use text::Text;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::{FieldKey, FieldValue};

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Format as a `#rrggbb` or `#rrggbbaa` hex string.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Stroke properties shared by every shape variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f64,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Rgba::black(),
            width: 2.0,
        }
    }
}

/// Enum wrapper for all shape types (for serialization and dispatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
    Line(Line),
    Text(Text),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Rectangle(s) => s.id,
            Shape::Circle(s) => s.id,
            Shape::Line(s) => s.id,
            Shape::Text(s) => s.id,
        }
    }

    /// Read one mutable field; `None` when the variant does not carry it.
    pub fn field(&self, key: FieldKey) -> Option<FieldValue> {
        match self {
            Shape::Rectangle(s) => s.field(key),
            Shape::Circle(s) => s.field(key),
            Shape::Line(s) => s.field(key),
            Shape::Text(s) => s.field(key),
        }
    }

    /// Overwrite one field. Returns false when the variant does not carry the
    /// key or the value has the wrong type; the shape is left untouched.
    pub fn set_field(&mut self, key: FieldKey, value: &FieldValue) -> bool {
        match self {
            Shape::Rectangle(s) => s.set_field(key, value),
            Shape::Circle(s) => s.set_field(key, value),
            Shape::Line(s) => s.set_field(key, value),
            Shape::Text(s) => s.set_field(key, value),
        }
    }

    /// Author of the last applied operation, if any.
    pub fn last_modified_by(&self) -> Option<&str> {
        match self {
            Shape::Rectangle(s) => s.last_modified_by.as_deref(),
            Shape::Circle(s) => s.last_modified_by.as_deref(),
            Shape::Line(s) => s.last_modified_by.as_deref(),
            Shape::Text(s) => s.last_modified_by.as_deref(),
        }
    }

    /// Timestamp (ms) of the last applied operation; 0 for a fresh shape.
    pub fn last_modified(&self) -> u64 {
        match self {
            Shape::Rectangle(s) => s.last_modified,
            Shape::Circle(s) => s.last_modified,
            Shape::Line(s) => s.last_modified,
            Shape::Text(s) => s.last_modified,
        }
    }

    /// Record who mutated the shape and when.
    pub fn set_modified(&mut self, user_id: impl Into<String>, timestamp: u64) {
        let user_id = Some(user_id.into());
        match self {
            Shape::Rectangle(s) => {
                s.last_modified_by = user_id;
                s.last_modified = timestamp;
            }
            Shape::Circle(s) => {
                s.last_modified_by = user_id;
                s.last_modified = timestamp;
            }
            Shape::Line(s) => {
                s.last_modified_by = user_id;
                s.last_modified = timestamp;
            }
            Shape::Text(s) => {
                s.last_modified_by = user_id;
                s.last_modified = timestamp;
            }
        }
    }
}

/// Read a fill field as a color value; absent fill reads as transparent so
/// last-write-wins merges always have a concrete value to compare.
pub(crate) fn fill_value(fill: Option<Rgba>) -> FieldValue {
    FieldValue::Color(fill.unwrap_or_else(Rgba::transparent))
}

/// Interpret an incoming fill color; a fully transparent color clears the fill.
pub(crate) fn fill_from_value(color: Rgba) -> Option<Rgba> {
    (color.a != 0).then_some(color)
}
