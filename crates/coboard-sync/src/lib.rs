//! Coboard Sync Library
//!
//! The link layer of the coboard shared canvas: connection state tracking,
//! the offline operation queue, backing-store abstractions, the session
//! orchestrator, and remote cursor smoothing. The pure model and transform
//! math live in `coboard-core`.

pub mod connection;
pub mod cursor;
pub mod error;
pub mod queue;
pub mod session;
pub mod store;

pub use connection::{ConnectionState, ConnectionStatus, ConnectionTracker};
pub use cursor::{CURSOR_TWEEN, CursorInterpolator, CursorSample, MAX_EXTRAPOLATION, RemoteCursor};
pub use error::{RemoteError, RemoteResult, StoreError, StoreResult, SyncError};
pub use queue::{FlushOutcome, OfflineQueue, QUEUE_STORAGE_KEY, QueueStatus, QueuedOperation};
pub use session::{CollabSession, OPERATIONS_COLLECTION};
pub use store::{
    BoxFuture, ChangeKind, FileKvStore, KvStore, MemoryKvStore, MemoryRemote, RemoteCollection,
    RemoteDocument, Snapshot, SnapshotListener, SnapshotRecord, Subscription,
};
