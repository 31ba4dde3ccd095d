//! The canonical representation of a pending shape mutation.

use serde::{Deserialize, Serialize};

use crate::fields::{FieldKey, FieldMap, FieldValue};
use crate::shapes::{Shape, ShapeId};

/// What an operation does to its target shape.
///
/// The variant order is meaningful: when two concurrent operations have
/// different kinds, the higher-priority kind wins (`Delete > Create > Update`,
/// with one carve-out for the create-vs-delete race, see the transform
/// engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl OpKind {
    pub(crate) fn priority(self) -> u8 {
        match self {
            OpKind::Update => 0,
            OpKind::Create => 1,
            OpKind::Delete => 2,
        }
    }
}

/// One field mutation: the value before and after the local edit.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub key: FieldKey,
    pub before: FieldValue,
    pub after: FieldValue,
}

impl FieldChange {
    pub fn new(key: FieldKey, before: impl Into<FieldValue>, after: impl Into<FieldValue>) -> Self {
        Self {
            key,
            before: before.into(),
            after: after.into(),
        }
    }

    /// Build a change against a shape's current value for `key`.
    ///
    /// Returns `None` when the shape does not carry the field.
    pub fn against(shape: &Shape, key: FieldKey, after: impl Into<FieldValue>) -> Option<Self> {
        let before = shape.field(key)?;
        Some(Self {
            key,
            before,
            after: after.into(),
        })
    }
}

/// One shape mutation attempt.
///
/// `delta` holds only the fields being changed and `base` the same fields'
/// values before the edit was applied locally; the two key sets are identical
/// for updates by construction, and empty for creates and deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    pub shape_id: ShapeId,
    /// Full shape payload, present on creates only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(default)]
    pub delta: FieldMap,
    #[serde(default)]
    pub base: FieldMap,
    /// Authorship time in milliseconds, monotonically assigned per author.
    pub timestamp: u64,
    pub user_id: String,
}

impl Operation {
    /// A create operation carrying the full initial shape.
    pub fn create(shape: Shape, user_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            kind: OpKind::Create,
            shape_id: shape.id(),
            shape: Some(shape),
            delta: FieldMap::new(),
            base: FieldMap::new(),
            timestamp,
            user_id: user_id.into(),
        }
    }

    /// An update operation built from `(before, after)` field changes, so the
    /// delta/base key sets always match.
    pub fn update(
        shape_id: ShapeId,
        changes: impl IntoIterator<Item = FieldChange>,
        user_id: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        let mut delta = FieldMap::new();
        let mut base = FieldMap::new();
        for change in changes {
            base.insert(change.key, change.before);
            delta.insert(change.key, change.after);
        }
        Self {
            kind: OpKind::Update,
            shape_id,
            shape: None,
            delta,
            base,
            timestamp,
            user_id: user_id.into(),
        }
    }

    /// A delete operation.
    pub fn delete(shape_id: ShapeId, user_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            kind: OpKind::Delete,
            shape_id,
            shape: None,
            delta: FieldMap::new(),
            base: FieldMap::new(),
            timestamp,
            user_id: user_id.into(),
        }
    }

    pub fn is_update(&self) -> bool {
        self.kind == OpKind::Update
    }

    pub fn is_delete(&self) -> bool {
        self.kind == OpKind::Delete
    }

    /// Fields changed by both operations.
    pub fn overlapping_fields(&self, other: &Operation) -> Vec<FieldKey> {
        self.delta
            .keys()
            .filter(|key| other.delta.contains_key(key))
            .copied()
            .collect()
    }

    /// Stable identity for remote persistence. Timestamps are monotonic per
    /// author, so the triple is unique and a retried write lands on the same
    /// remote document instead of duplicating it.
    pub fn identity(&self) -> String {
        format!("{}:{}:{}", self.user_id, self.shape_id, self.timestamp)
    }
}
