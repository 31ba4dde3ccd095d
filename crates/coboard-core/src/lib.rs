//! Coboard Core Library
//!
//! Shape model, operation model, operational transform and conflict
//! detection for the coboard shared canvas. Everything here is pure and
//! synchronous; the link layer lives in `coboard-sync`.

pub mod clock;
pub mod conflict;
pub mod document;
pub mod fields;
pub mod operation;
pub mod shapes;
pub mod transform;

pub use clock::LogicalClock;
pub use conflict::{CONCURRENCY_WINDOW_MS, ConflictDetector, ConflictKind, ConflictStats};
pub use document::BoardDocument;
pub use fields::{FieldClass, FieldKey, FieldMap, FieldValue};
pub use operation::{FieldChange, OpKind, Operation};
pub use shapes::{Circle, Line, Rectangle, Rgba, Shape, ShapeId, Stroke, Text};
pub use transform::{apply_operation, transform, wrap_degrees};
