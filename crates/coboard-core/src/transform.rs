//! Operational transform for concurrent shape edits.
//!
//! [`transform`] rewrites one operation given another that ran concurrently
//! against the same shape. Callers invoke it symmetrically: each side passes
//! its own operation first and the other side's second, and a `None` result
//! means the first operation is discarded outright.

use std::collections::BTreeSet;

use crate::fields::{FieldClass, FieldKey, FieldMap, FieldValue};
use crate::operation::{OpKind, Operation};
use crate::shapes::Shape;

/// Tolerance below which a size base is treated as degenerate.
const SIZE_EPSILON: f64 = 1e-9;

/// Resolve `op` against a concurrent `against` on the same shape.
///
/// Priority between kinds is `Delete > Create > Update`: the lower-priority
/// operation is discarded. The one exception is the create-vs-delete race,
/// where the create wins: the object was recreated concurrently with being
/// removed, so it still exists. Two concurrent updates merge field by field.
pub fn transform(op: &Operation, against: &Operation) -> Option<Operation> {
    debug_assert_eq!(op.shape_id, against.shape_id);

    match (op.kind, against.kind) {
        (OpKind::Update, OpKind::Update) => Some(merge_updates(op, against)),
        (OpKind::Create, OpKind::Delete) => Some(op.clone()),
        (OpKind::Delete, OpKind::Create) => None,
        // Same-kind races resolve deterministically by (timestamp, author).
        (OpKind::Create, OpKind::Create) | (OpKind::Delete, OpKind::Delete) => {
            wins(op, against).then(|| op.clone())
        }
        _ => (op.kind.priority() > against.kind.priority()).then(|| op.clone()),
    }
}

/// Produce a new shape snapshot with `op.delta` overwritten onto `shape`.
///
/// Fields the delta does not name are unchanged; authorship metadata is
/// recorded on the result.
pub fn apply_operation(shape: &Shape, op: &Operation) -> Shape {
    let mut next = shape.clone();
    for (key, value) in &op.delta {
        if !next.set_field(*key, value) {
            log::debug!("shape {} does not carry {key:?}, skipping field", op.shape_id);
        }
    }
    next.set_modified(op.user_id.clone(), op.timestamp);
    next
}

/// Wrap an angle into `[0, 360)` degrees; negative angles wrap forward.
pub fn wrap_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Deterministic total order used for last-write-wins decisions and
/// same-kind races: later timestamp first, author id as the tie-breaker.
fn wins(a: &Operation, b: &Operation) -> bool {
    (a.timestamp, a.user_id.as_str()) > (b.timestamp, b.user_id.as_str())
}

fn numeric(map: &FieldMap, key: FieldKey) -> Option<f64> {
    map.get(&key).and_then(FieldValue::as_number)
}

fn merge_updates(a: &Operation, b: &Operation) -> Operation {
    // Common base snapshot: prefer a's recorded values, fill in b's.
    let mut base = a.base.clone();
    for (key, value) in &b.base {
        base.entry(*key).or_insert_with(|| value.clone());
    }

    let keys: BTreeSet<FieldKey> = a.delta.keys().chain(b.delta.keys()).copied().collect();
    let mut delta = FieldMap::new();
    for key in keys {
        let merged = match (a.delta.get(&key), b.delta.get(&key)) {
            (Some(av), Some(bv)) => merge_field(key, a, b, av, bv),
            (Some(av), None) => av.clone(),
            (None, Some(bv)) => bv.clone(),
            (None, None) => unreachable!("key came from one of the deltas"),
        };
        delta.insert(key, merged);
    }

    let author = if wins(a, b) { a } else { b };
    Operation {
        kind: OpKind::Update,
        shape_id: a.shape_id,
        shape: None,
        delta,
        base,
        timestamp: a.timestamp.max(b.timestamp),
        user_id: author.user_id.clone(),
    }
}

/// Merge one field both operations changed, according to its class.
fn merge_field(
    key: FieldKey,
    a: &Operation,
    b: &Operation,
    av: &FieldValue,
    bv: &FieldValue,
) -> FieldValue {
    let last_write = || {
        if wins(a, b) {
            av.clone()
        } else {
            bv.clone()
        }
    };

    let parts = (
        numeric(&a.base, key),
        av.as_number(),
        numeric(&b.base, key),
        bv.as_number(),
    );
    let (Some(base_a), Some(val_a), Some(base_b), Some(val_b)) = parts else {
        // Non-numeric or missing base state: fall back to last-write-wins.
        return last_write();
    };

    match key.class() {
        FieldClass::Position => {
            // Both displacement vectors summed onto the common base.
            FieldValue::Number(base_a + (val_a - base_a) + (val_b - base_b))
        }
        FieldClass::Size => {
            if base_a.abs() < SIZE_EPSILON || base_b.abs() < SIZE_EPSILON {
                return last_write();
            }
            FieldValue::Number(base_a * (val_a / base_a) * (val_b / base_b))
        }
        FieldClass::Rotation => {
            FieldValue::Number(wrap_degrees(base_a + (val_a - base_a) + (val_b - base_b)))
        }
        FieldClass::Style => last_write(),
    }
}
