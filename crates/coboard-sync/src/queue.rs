//! Offline operation queue.
//!
//! Operations that cannot reach the remote store are queued here and
//! replayed in enqueue order on reconnect. The queue is the single writer of
//! entry statuses, and persists itself through a [`KvStore`] so a non-empty
//! queue survives an application restart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coboard_core::Operation;

use crate::error::RemoteError;
use crate::store::{KvStore, RemoteCollection, RemoteDocument};

/// Key the queue persists itself under.
pub const QUEUE_STORAGE_KEY: &str = "coboard.offline_queue";

/// Lifecycle of a queued entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Failed,
    Completed,
}

/// A persisted envelope around an operation awaiting delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: Uuid,
    pub op: Operation,
    pub status: QueueStatus,
    #[serde(default)]
    pub error: Option<String>,
    /// Authorship time of the wrapped operation, for the queue viewer.
    pub queued_at: u64,
}

/// What a flush accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Entries delivered and removed.
    pub sent: usize,
    /// Entries marked failed (left in place for manual retry).
    pub failed: usize,
    /// True when a network error halted the flush; remaining entries stay
    /// pending, not failed.
    pub aborted: bool,
}

/// Ordered queue of operations made while disconnected.
pub struct OfflineQueue<K: KvStore> {
    store: Arc<K>,
    entries: Vec<QueuedOperation>,
}

impl<K: KvStore> OfflineQueue<K> {
    /// Create a queue backed by the given store, restoring any persisted
    /// entries from a previous run.
    pub fn new(store: Arc<K>) -> Self {
        let entries = match store.get(QUEUE_STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("discarding unreadable offline queue: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("could not load offline queue: {e}");
                Vec::new()
            }
        };
        Self { store, entries }
    }

    /// Queue an operation for later delivery. Always succeeds locally.
    pub fn enqueue(&mut self, op: Operation) -> QueuedOperation {
        let entry = QueuedOperation {
            id: Uuid::new_v4(),
            queued_at: op.timestamp,
            op,
            status: QueueStatus::Pending,
            error: None,
        };
        self.entries.push(entry.clone());
        self.persist();
        log::debug!("queued operation for {} ({} pending)", entry.op.shape_id, self.pending_len());
        entry
    }

    /// Send every pending entry, one awaited write at a time, in enqueue
    /// order. Individual timeout or permission failures mark the entry
    /// failed and move on; a network failure aborts the flush and leaves the
    /// remaining entries pending.
    pub async fn flush(
        &mut self,
        remote: &dyn RemoteCollection,
        collection: &str,
    ) -> FlushOutcome {
        let pending: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| entry.status == QueueStatus::Pending)
            .map(|entry| entry.id)
            .collect();

        let mut outcome = FlushOutcome::default();
        for id in pending {
            let document = {
                let Some(entry) = self.entries.iter().find(|entry| entry.id == id) else {
                    continue;
                };
                match serde_json::to_value(&entry.op) {
                    Ok(data) => RemoteDocument::new(entry.op.identity(), data),
                    Err(e) => {
                        self.mark_failed(id, format!("serialization error: {e}"));
                        outcome.failed += 1;
                        continue;
                    }
                }
            };

            match remote.write(collection, document).await {
                Ok(()) => {
                    self.mark_completed(id);
                    outcome.sent += 1;
                }
                Err(RemoteError::Network(reason)) => {
                    log::warn!("flush aborted, link lost: {reason}");
                    outcome.aborted = true;
                    break;
                }
                Err(err) => {
                    log::warn!("queued write failed: {err}");
                    self.mark_failed(id, err.to_string());
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Delivery confirmed: drop the entry.
    pub fn mark_completed(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Delivery failed: keep the entry visible for manual retry.
    pub fn mark_failed(&mut self, id: Uuid, reason: impl Into<String>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        entry.status = QueueStatus::Failed;
        entry.error = Some(reason.into());
        self.persist();
        true
    }

    /// Reset one failed entry to pending.
    pub fn retry(&mut self, id: Uuid) -> bool {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id && entry.status == QueueStatus::Failed)
        else {
            return false;
        };
        entry.status = QueueStatus::Pending;
        entry.error = None;
        self.persist();
        true
    }

    /// Reset every failed entry to pending. Returns how many were reset.
    pub fn retry_all_failed(&mut self) -> usize {
        let mut reset = 0;
        for entry in &mut self.entries {
            if entry.status == QueueStatus::Failed {
                entry.status = QueueStatus::Pending;
                entry.error = None;
                reset += 1;
            }
        }
        if reset > 0 {
            self.persist();
        }
        reset
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    /// Read-only snapshot of the queue.
    pub fn entries(&self) -> &[QueuedOperation] {
        &self.entries
    }

    pub fn pending_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status == QueueStatus::Pending)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("could not serialize offline queue: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(QUEUE_STORAGE_KEY, &json) {
            log::warn!("could not persist offline queue: {e}");
        }
    }
}

impl<K: KvStore> std::fmt::Debug for OfflineQueue<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("entries", &self.entries)
            .finish()
    }
}
