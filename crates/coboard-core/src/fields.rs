//! Field keys and values for partial shape mutations.
//!
//! An operation's delta names the fields it changes through a closed
//! [`FieldKey`] set. The transform engine decides how two concurrent edits to
//! the same field combine by looking at the key's [`FieldClass`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shapes::Rgba;

/// The closed set of mutable shape fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    X,
    Y,
    Width,
    Height,
    Radius,
    Rotation,
    Fill,
    Stroke,
    StrokeWidth,
    FontSize,
    FontFamily,
    Content,
}

/// How concurrent edits to a field are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Displacements are summed onto the common base (`x`, `y`).
    Position,
    /// Scale factors are multiplied onto the common base (`width`, `height`, `radius`).
    Size,
    /// Deltas are summed and wrapped into `[0, 360)` degrees.
    Rotation,
    /// Last write wins by timestamp (colors, stroke width, font, text content).
    Style,
}

impl FieldKey {
    /// The merge class this field belongs to.
    pub fn class(self) -> FieldClass {
        match self {
            FieldKey::X | FieldKey::Y => FieldClass::Position,
            FieldKey::Width | FieldKey::Height | FieldKey::Radius => FieldClass::Size,
            FieldKey::Rotation => FieldClass::Rotation,
            FieldKey::Fill
            | FieldKey::Stroke
            | FieldKey::StrokeWidth
            | FieldKey::FontSize
            | FieldKey::FontFamily
            | FieldKey::Content => FieldClass::Style,
        }
    }
}

/// A single field value inside an operation delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Color(Rgba),
}

impl FieldValue {
    /// Numeric view of the value, if it is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Rgba> for FieldValue {
    fn from(value: Rgba) -> Self {
        FieldValue::Color(value)
    }
}

/// Partial field mapping used for operation deltas and base snapshots.
///
/// A `BTreeMap` keeps key order deterministic, which the transform engine
/// relies on when merging two deltas field by field.
pub type FieldMap = BTreeMap<FieldKey, FieldValue>;
