//! Concurrency detection and conflict classification.
//!
//! Two operations conflict when they target the same shape within a fixed
//! concurrency window. Operations further apart in time are sequential: the
//! later one simply overwrites the earlier and no transform is needed.

use serde::{Deserialize, Serialize};

use crate::fields::FieldKey;
use crate::operation::Operation;

/// Width of the concurrency window in milliseconds.
pub const CONCURRENCY_WINDOW_MS: u64 = 1_000;

/// How two concurrent operations interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The overlapping fields include `x` or `y`.
    Position,
    /// Any other field interaction, including disjoint-field concurrency.
    Property,
    /// At least one side removes the shape.
    Delete,
}

/// Rolling conflict counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictStats {
    pub position: u64,
    pub property: u64,
    pub delete: u64,
    /// Conflicts the transform engine has resolved.
    pub resolved: u64,
}

impl ConflictStats {
    /// Total conflicts observed since the last reset.
    pub fn total(&self) -> u64 {
        self.position + self.property + self.delete
    }
}

/// Classifies operation pairs and keeps rolling statistics.
#[derive(Debug, Default)]
pub struct ConflictDetector {
    stats: ConflictStats,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff both operations target the same shape and their authorship
    /// timestamps fall within the concurrency window.
    pub fn are_concurrent(&self, a: &Operation, b: &Operation) -> bool {
        a.shape_id == b.shape_id && a.timestamp.abs_diff(b.timestamp) <= CONCURRENCY_WINDOW_MS
    }

    /// True for every concurrent pair, whether or not the touched fields
    /// overlap; disjoint-field concurrent edits still route through the
    /// transform engine and are recorded as low-severity conflicts.
    pub fn has_conflict(&self, a: &Operation, b: &Operation) -> bool {
        self.are_concurrent(a, b)
    }

    /// Classify a pair without recording it.
    pub fn classify(&self, a: &Operation, b: &Operation) -> Option<ConflictKind> {
        if !self.are_concurrent(a, b) {
            return None;
        }
        if a.is_delete() || b.is_delete() {
            return Some(ConflictKind::Delete);
        }
        let overlap = a.overlapping_fields(b);
        if overlap.contains(&FieldKey::X) || overlap.contains(&FieldKey::Y) {
            Some(ConflictKind::Position)
        } else {
            Some(ConflictKind::Property)
        }
    }

    /// Classify a pair and add it to the rolling counters.
    pub fn record(&mut self, a: &Operation, b: &Operation) -> Option<ConflictKind> {
        let kind = self.classify(a, b)?;
        match kind {
            ConflictKind::Position => self.stats.position += 1,
            ConflictKind::Property => self.stats.property += 1,
            ConflictKind::Delete => self.stats.delete += 1,
        }
        Some(kind)
    }

    /// Count one conflict as resolved by the transform engine.
    pub fn record_resolution(&mut self) {
        self.stats.resolved += 1;
    }

    pub fn stats(&self) -> ConflictStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ConflictStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::FieldChange;
    use uuid::Uuid;

    fn move_op(id: Uuid, user: &str, ts: u64) -> Operation {
        Operation::update(id, [FieldChange::new(FieldKey::X, 0.0, 10.0)], user, ts)
    }

    fn style_op(id: Uuid, user: &str, ts: u64) -> Operation {
        Operation::update(
            id,
            [FieldChange::new(FieldKey::StrokeWidth, 2.0, 4.0)],
            user,
            ts,
        )
    }

    #[test]
    fn test_concurrency_window() {
        let detector = ConflictDetector::new();
        let id = Uuid::new_v4();

        // 500ms apart: concurrent. 2000ms apart: sequential.
        assert!(detector.are_concurrent(&move_op(id, "a", 1_000), &move_op(id, "b", 1_500)));
        assert!(!detector.are_concurrent(&move_op(id, "a", 1_000), &move_op(id, "b", 3_000)));

        // Concurrency alone is a conflict, even with disjoint fields.
        assert!(detector.has_conflict(&move_op(id, "a", 1_000), &style_op(id, "b", 1_500)));
        assert!(!detector.has_conflict(&move_op(id, "a", 1_000), &style_op(id, "b", 3_000)));
    }

    #[test]
    fn test_different_shapes_never_concurrent() {
        let detector = ConflictDetector::new();
        let a = move_op(Uuid::new_v4(), "a", 1_000);
        let b = move_op(Uuid::new_v4(), "b", 1_000);
        assert!(!detector.are_concurrent(&a, &b));
        assert_eq!(detector.classify(&a, &b), None);
    }

    #[test]
    fn test_classification() {
        let detector = ConflictDetector::new();
        let id = Uuid::new_v4();

        assert_eq!(
            detector.classify(&move_op(id, "a", 100), &move_op(id, "b", 200)),
            Some(ConflictKind::Position)
        );
        assert_eq!(
            detector.classify(&style_op(id, "a", 100), &style_op(id, "b", 200)),
            Some(ConflictKind::Property)
        );
        assert_eq!(
            detector.classify(&move_op(id, "a", 100), &Operation::delete(id, "b", 200)),
            Some(ConflictKind::Delete)
        );
        // Disjoint fields are still a (low-severity) property conflict.
        assert_eq!(
            detector.classify(&move_op(id, "a", 100), &style_op(id, "b", 200)),
            Some(ConflictKind::Property)
        );
    }

    #[test]
    fn test_stats_roll_and_reset() {
        let mut detector = ConflictDetector::new();
        let id = Uuid::new_v4();

        detector.record(&move_op(id, "a", 100), &move_op(id, "b", 200));
        detector.record(&move_op(id, "a", 100), &Operation::delete(id, "b", 200));
        detector.record_resolution();

        let stats = detector.stats();
        assert_eq!(stats.position, 1);
        assert_eq!(stats.delete, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.total(), 2);

        detector.reset_stats();
        assert_eq!(detector.stats(), ConflictStats::default());
    }
}
