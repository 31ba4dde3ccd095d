//! Board document: the in-memory shape map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conflict::CONCURRENCY_WINDOW_MS;
use crate::operation::{OpKind, Operation};
use crate::shapes::{Shape, ShapeId};
use crate::transform::apply_operation;

/// The authoritative local view of the shared canvas.
///
/// Shapes are mutated only by applying (possibly transformed) operations, so
/// every write path funnels through the same reconciliation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    /// All shapes in the document, keyed by ID.
    pub shapes: HashMap<ShapeId, Shape>,
    /// Z-order of shapes (back to front).
    pub z_order: Vec<ShapeId>,
}

impl Default for BoardDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            shapes: HashMap::new(),
            z_order: Vec::new(),
        }
    }

    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Apply an already-reconciled operation. Returns false when the
    /// operation had no effect (missing target, stale timestamp, or a create
    /// without a payload).
    pub fn apply(&mut self, op: &Operation) -> bool {
        match op.kind {
            OpKind::Create => {
                let Some(shape) = &op.shape else {
                    log::warn!("create for {} carries no shape payload", op.shape_id);
                    return false;
                };
                let mut shape = shape.clone();
                shape.set_modified(op.user_id.clone(), op.timestamp);
                if self.shapes.insert(op.shape_id, shape).is_none() {
                    self.z_order.push(op.shape_id);
                }
                true
            }
            OpKind::Delete => {
                self.z_order.retain(|id| *id != op.shape_id);
                self.shapes.remove(&op.shape_id).is_some()
            }
            OpKind::Update => {
                let Some(current) = self.shapes.get(&op.shape_id) else {
                    log::debug!("update for unknown shape {}, skipping", op.shape_id);
                    return false;
                };
                // A strictly older sequential update must not clobber newer
                // state when snapshots arrive out of logical order.
                if op.timestamp + CONCURRENCY_WINDOW_MS < current.last_modified() {
                    log::debug!("stale update for {} ignored", op.shape_id);
                    return false;
                }
                let next = apply_operation(current, op);
                self.shapes.insert(op.shape_id, next);
                true
            }
        }
    }

    /// Serialize the document to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldKey, FieldValue};
    use crate::operation::FieldChange;
    use crate::shapes::Rectangle;
    use kurbo::Point;

    fn rect_shape() -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0))
    }

    #[test]
    fn test_create_update_delete_cycle() {
        let mut doc = BoardDocument::new();
        let shape = rect_shape();
        let id = shape.id();

        assert!(doc.apply(&Operation::create(shape, "a", 100)));
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.z_order, vec![id]);

        let update = Operation::update(
            id,
            [FieldChange::new(FieldKey::X, 0.0, 40.0)],
            "a",
            200,
        );
        assert!(doc.apply(&update));
        assert_eq!(
            doc.shape(&id).unwrap().field(FieldKey::X),
            Some(FieldValue::Number(40.0))
        );

        assert!(doc.apply(&Operation::delete(id, "a", 300)));
        assert!(doc.is_empty());
        assert!(doc.z_order.is_empty());
    }

    #[test]
    fn test_stale_update_is_ignored() {
        let mut doc = BoardDocument::new();
        let shape = rect_shape();
        let id = shape.id();
        doc.apply(&Operation::create(shape, "a", 10_000));

        let newer = Operation::update(
            id,
            [FieldChange::new(FieldKey::X, 0.0, 50.0)],
            "a",
            10_500,
        );
        doc.apply(&newer);

        // An update authored long before the shape's last modification
        // arrives late; it must not clobber newer state.
        let stale = Operation::update(
            id,
            [FieldChange::new(FieldKey::X, 0.0, 5.0)],
            "b",
            2_000,
        );
        assert!(!doc.apply(&stale));
        assert_eq!(
            doc.shape(&id).unwrap().field(FieldKey::X),
            Some(FieldValue::Number(50.0))
        );
    }

    #[test]
    fn test_update_for_unknown_shape_is_skipped() {
        let mut doc = BoardDocument::new();
        let op = Operation::update(
            Uuid::new_v4(),
            [FieldChange::new(FieldKey::X, 0.0, 1.0)],
            "a",
            100,
        );
        assert!(!doc.apply(&op));
    }

    #[test]
    fn test_recreate_keeps_single_z_order_entry() {
        let mut doc = BoardDocument::new();
        let shape = rect_shape();
        let id = shape.id();

        doc.apply(&Operation::create(shape.clone(), "a", 100));
        doc.apply(&Operation::create(shape, "b", 150));
        assert_eq!(doc.z_order, vec![id]);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut doc = BoardDocument::new();
        doc.name = "whiteboard".to_string();
        doc.apply(&Operation::create(rect_shape(), "a", 100));

        let json = doc.to_json().unwrap();
        let back = BoardDocument::from_json(&json).unwrap();
        assert_eq!(back.name, "whiteboard");
        assert_eq!(back.len(), 1);
        assert_eq!(back.z_order, doc.z_order);
    }
}
