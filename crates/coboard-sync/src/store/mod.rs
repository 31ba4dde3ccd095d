//! Backing-store abstractions.
//!
//! The core treats the backend as two opaque collaborators: a push-style
//! remote collection (the shared document store) and a local key-value store
//! (queue persistence across reloads). Implementations can sit on any
//! transport; the session logic only assumes eventually-delivered, possibly
//! reordered update events.

mod file;
mod memory;

pub use file::FileKvStore;
pub use memory::{MemoryKvStore, MemoryRemote};

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

pub use crate::error::{RemoteError, RemoteResult, StoreError, StoreResult};

/// Boxed future for async operations at the network boundary.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// One document written to a remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub data: serde_json::Value,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// What happened to a document in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One changed document inside a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub id: String,
    pub change: ChangeKind,
    pub data: serde_json::Value,
}

/// A batch of document changes pushed by the remote store.
///
/// Snapshots may arrive out of logical order; consumers re-derive
/// correctness from operation timestamps, not arrival order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<SnapshotRecord>,
}

impl Snapshot {
    pub fn single(record: SnapshotRecord) -> Self {
        Self {
            records: vec![record],
        }
    }
}

/// Callback invoked for every pushed snapshot.
pub type SnapshotListener = Box<dyn Fn(Snapshot) + Send + Sync>;

/// Handle for an active subscription; dropping it (or calling
/// [`Subscription::unsubscribe`]) detaches the listener.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Detach the listener.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The remote document store.
pub trait RemoteCollection: Send + Sync {
    /// Persist one document.
    fn write(&self, collection: &str, document: RemoteDocument) -> BoxFuture<'_, RemoteResult<()>>;

    /// Persist several documents in one round-trip.
    fn batch_write(
        &self,
        collection: &str,
        documents: Vec<RemoteDocument>,
    ) -> BoxFuture<'_, RemoteResult<()>>;

    /// Register for push notification of document changes in a collection.
    fn subscribe(
        &self,
        collection: &str,
        listener: SnapshotListener,
    ) -> RemoteResult<Subscription>;
}

/// The local key-value store.
///
/// Synchronous on purpose: local persistence must never depend on
/// connectivity, and the queue relies on `enqueue` always succeeding
/// without awaiting anything.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}
