//! Session orchestration for real-time multi-user editing.
//!
//! [`CollabSession`] is the one-per-session service object that ties the
//! pieces together: local edits apply optimistically and then route to the
//! remote store or the offline queue depending on link health; remote
//! operations arriving through the push subscription are reconciled against
//! concurrent local edits before they touch the document.

use std::sync::Arc;

use uuid::Uuid;

use coboard_core::{
    BoardDocument, ConflictDetector, ConflictStats, FieldChange, LogicalClock, Operation, Shape,
    ShapeId, transform,
};

use crate::connection::{ConnectionState, ConnectionStatus, ConnectionTracker};
use crate::error::RemoteError;
use crate::queue::{OfflineQueue, QueuedOperation};
use crate::store::{ChangeKind, KvStore, RemoteCollection, RemoteDocument, Snapshot};

/// Remote collection the operation log is written to.
pub const OPERATIONS_COLLECTION: &str = "operations";

/// Local operations are kept for conflict matching this long (in authored
/// time) before being pruned; double the concurrency window so boundary
/// cases are never pruned early.
const RECENT_WINDOW_MS: u64 = 2 * coboard_core::CONCURRENCY_WINDOW_MS;

/// One collaborative editing session.
pub struct CollabSession<R: RemoteCollection, K: KvStore> {
    user_id: String,
    document: BoardDocument,
    detector: ConflictDetector,
    tracker: ConnectionTracker,
    queue: OfflineQueue<K>,
    remote: Arc<R>,
    clock: LogicalClock,
    /// Recently applied local operations, for concurrency matching against
    /// incoming remote operations.
    recent_local: Vec<Operation>,
}

impl<R: RemoteCollection, K: KvStore> CollabSession<R, K> {
    /// Create a session for one user. Any offline queue persisted by a
    /// previous run is restored and reflected in the connection state.
    pub fn new(user_id: impl Into<String>, remote: Arc<R>, store: Arc<K>) -> Self {
        let queue = OfflineQueue::new(store);
        let mut tracker = ConnectionTracker::new();
        tracker.set_queue_length(queue.pending_len());
        Self {
            user_id: user_id.into(),
            document: BoardDocument::new(),
            detector: ConflictDetector::new(),
            tracker,
            queue,
            remote,
            clock: LogicalClock::new(),
            recent_local: Vec::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn document(&self) -> &BoardDocument {
        &self.document
    }

    pub fn connection(&self) -> &ConnectionState {
        self.tracker.state()
    }

    /// Register a callback for connection state changes (banner, viewer).
    pub fn on_connection_change(
        &mut self,
        observer: impl Fn(&ConnectionState) + Send + Sync + 'static,
    ) {
        self.tracker.subscribe(observer);
    }

    pub fn conflict_stats(&self) -> ConflictStats {
        self.detector.stats()
    }

    pub fn reset_conflict_stats(&mut self) {
        self.detector.reset_stats();
    }

    /// Read-only snapshot of the offline queue, for the queue viewer.
    pub fn queued(&self) -> &[QueuedOperation] {
        self.queue.entries()
    }

    /// Reset one failed queue entry to pending.
    pub fn retry_queued(&mut self, id: Uuid) -> bool {
        let reset = self.queue.retry(id);
        self.sync_queue_length();
        reset
    }

    /// Reset every failed queue entry to pending.
    pub fn retry_all_queued(&mut self) -> usize {
        let reset = self.queue.retry_all_failed();
        self.sync_queue_length();
        reset
    }

    /// Drop every queue entry.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.sync_queue_length();
    }

    // --- Local edits ---

    /// Create a shape authored by this session.
    pub async fn create_shape(&mut self, shape: Shape) -> Operation {
        let op = Operation::create(shape, self.user_id.clone(), self.clock.now_ms());
        self.apply_local(op.clone()).await;
        op
    }

    /// Update a shape authored by this session.
    pub async fn update_shape(
        &mut self,
        shape_id: ShapeId,
        changes: impl IntoIterator<Item = FieldChange>,
    ) -> Operation {
        let op = Operation::update(shape_id, changes, self.user_id.clone(), self.clock.now_ms());
        self.apply_local(op.clone()).await;
        op
    }

    /// Delete a shape authored by this session.
    pub async fn delete_shape(&mut self, shape_id: ShapeId) -> Operation {
        let op = Operation::delete(shape_id, self.user_id.clone(), self.clock.now_ms());
        self.apply_local(op.clone()).await;
        op
    }

    /// Apply a local operation optimistically, then route it to the remote
    /// store or the offline queue. The document mutation never waits for the
    /// network round-trip.
    pub async fn apply_local(&mut self, op: Operation) {
        self.document.apply(&op);
        self.remember_local(op.clone());

        if self.tracker.status() != ConnectionStatus::Connected {
            self.queue.enqueue(op);
            self.sync_queue_length();
            return;
        }

        let document = match serde_json::to_value(&op) {
            Ok(data) => RemoteDocument::new(op.identity(), data),
            Err(e) => {
                log::warn!("could not serialize operation {}: {e}", op.identity());
                return;
            }
        };

        let remote = self.remote.clone();
        let result = remote.write(OPERATIONS_COLLECTION, document).await;
        match result {
            Ok(()) => {}
            Err(RemoteError::Network(reason)) => {
                log::warn!("write failed, going offline: {reason}");
                self.queue.enqueue(op);
                self.tracker.mark_offline();
                self.sync_queue_length();
            }
            Err(RemoteError::Timeout(reason)) => {
                // Surfaced as a failed queue entry, never a crash.
                let entry = self.queue.enqueue(op);
                self.queue.mark_failed(entry.id, reason);
                self.sync_queue_length();
            }
            Err(err @ RemoteError::Permission(_)) => {
                // Not retryable until authorization changes; keep the link
                // status and surface the message.
                self.tracker.set_error(err.to_string());
            }
        }
    }

    // --- Remote operations ---

    /// Entry point for the push subscription. Each record is parsed,
    /// reconciled against concurrent local edits, and applied; malformed
    /// records are skipped without affecting their siblings.
    pub fn handle_snapshot(&mut self, snapshot: Snapshot) {
        for record in snapshot.records {
            if record.change == ChangeKind::Removed {
                continue;
            }
            let op: Operation = match serde_json::from_value(record.data) {
                Ok(op) => op,
                Err(e) => {
                    log::warn!("skipping malformed record {}: {e}", record.id);
                    continue;
                }
            };
            // Our own operations come back through the subscription too.
            if op.user_id == self.user_id {
                continue;
            }
            self.apply_remote(op);
        }
    }

    fn apply_remote(&mut self, op: Operation) {
        let mut incoming = op;
        let mut discarded = false;
        for local in &self.recent_local {
            if local.shape_id != incoming.shape_id {
                continue;
            }
            if self.detector.record(&incoming, local).is_none() {
                continue;
            }
            match transform(&incoming, local) {
                Some(rewritten) => {
                    incoming = rewritten;
                    self.detector.record_resolution();
                }
                None => {
                    discarded = true;
                    self.detector.record_resolution();
                    break;
                }
            }
        }
        if !discarded {
            self.document.apply(&incoming);
        }
    }

    // --- Connectivity ---

    /// External signal: the link dropped.
    pub fn link_lost(&mut self) {
        self.tracker.mark_offline();
    }

    /// External signal: the link came back. Replays the offline queue.
    pub async fn link_restored(&mut self) {
        self.sync_now().await;
    }

    /// Flush the offline queue now and settle the connection state.
    pub async fn sync_now(&mut self) {
        if self.tracker.status() == ConnectionStatus::Error {
            self.tracker.retry();
        }
        if self.queue.pending_len() == 0 && self.tracker.status() == ConnectionStatus::Connected {
            return;
        }

        self.tracker.begin_sync();
        let remote = self.remote.clone();
        let outcome = self.queue.flush(remote.as_ref(), OPERATIONS_COLLECTION).await;
        self.sync_queue_length();

        if outcome.aborted {
            self.tracker.mark_offline();
        } else if outcome.failed > 0 && outcome.sent == 0 {
            // Nothing got through even though the link is up.
            self.tracker.mark_error(format!(
                "sync failed: {} operations could not be delivered",
                outcome.failed
            ));
        } else {
            self.tracker.mark_connected();
        }
        log::info!(
            "sync finished: {} sent, {} failed, aborted: {}",
            outcome.sent,
            outcome.failed,
            outcome.aborted
        );
    }

    /// User-triggered retry from the error state.
    pub async fn retry_connection(&mut self) {
        self.tracker.retry();
        self.sync_now().await;
    }

    fn sync_queue_length(&mut self) {
        self.tracker.set_queue_length(self.queue.pending_len());
    }

    fn remember_local(&mut self, op: Operation) {
        let horizon = op.timestamp.saturating_sub(RECENT_WINDOW_MS);
        self.recent_local.retain(|earlier| earlier.timestamp >= horizon);
        self.recent_local.push(op);
    }
}
