//! Error taxonomy for the link layer.

use thiserror::Error;

/// Failures surfaced by the remote collection.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Transient link failure; the operation is queued and retried.
    #[error("network unavailable: {0}")]
    Network(String),
    /// Not retryable until the caller's authorization changes.
    #[error("permission denied: {0}")]
    Permission(String),
    /// An individual write ran out of time; surfaces as a failed queue entry.
    #[error("write timed out: {0}")]
    Timeout(String),
}

impl RemoteError {
    /// Whether retrying without any external change can help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RemoteError::Permission(_))
    }
}

/// Failures from the local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Other(String),
}

/// Umbrella error for session-level operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A remote record failed to parse; it is skipped and logged, and
    /// sibling records in the same snapshot are unaffected.
    #[error("malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}

/// Result type for remote-collection operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result type for key-value store operations.
pub type StoreResult<T> = Result<T, StoreError>;
