//! In-memory store implementations for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::{
    BoxFuture, ChangeKind, KvStore, RemoteCollection, RemoteDocument, RemoteError, RemoteResult,
    Snapshot, SnapshotListener, SnapshotRecord, StoreError, StoreResult, Subscription,
};

/// In-memory key-value store.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        entries.remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct RemoteInner {
    collections: RwLock<HashMap<String, HashMap<String, serde_json::Value>>>,
    listeners: RwLock<HashMap<String, Vec<(u64, Arc<SnapshotListener>)>>>,
    write_log: RwLock<Vec<RemoteDocument>>,
    next_listener_id: AtomicU64,
    /// Fail the next N writes with a network error.
    fail_next: AtomicU32,
    /// Fail the next N writes with a timeout.
    time_out_next: AtomicU32,
    /// Reject every write with a permission error while set.
    deny: AtomicBool,
}

impl RemoteInner {
    fn notify(&self, collection: &str, record: SnapshotRecord) {
        let listeners: Vec<Arc<SnapshotListener>> = match self.listeners.read() {
            Ok(map) => map
                .get(collection)
                .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        for listener in listeners {
            listener(Snapshot::single(record.clone()));
        }
    }

    fn store(&self, collection: &str, document: RemoteDocument) -> RemoteResult<()> {
        if self.fail_next.load(Ordering::SeqCst) > 0 {
            self.fail_next.fetch_sub(1, Ordering::SeqCst);
            return Err(RemoteError::Network("injected network failure".into()));
        }
        if self.time_out_next.load(Ordering::SeqCst) > 0 {
            self.time_out_next.fetch_sub(1, Ordering::SeqCst);
            return Err(RemoteError::Timeout("injected timeout".into()));
        }
        if self.deny.load(Ordering::SeqCst) {
            return Err(RemoteError::Permission("injected permission failure".into()));
        }

        let change = {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| RemoteError::Network("store lock poisoned".into()))?;
            let docs = collections.entry(collection.to_string()).or_default();
            match docs.insert(document.id.clone(), document.data.clone()) {
                Some(_) => ChangeKind::Modified,
                None => ChangeKind::Added,
            }
        };

        if let Ok(mut log) = self.write_log.write() {
            log.push(document.clone());
        }

        self.notify(
            collection,
            SnapshotRecord {
                id: document.id,
                change,
                data: document.data,
            },
        );
        Ok(())
    }
}

/// In-memory remote collection with failure injection, for tests.
///
/// Writes are applied synchronously and pushed to subscribed listeners the
/// way a real backend would push snapshot updates.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<RemoteInner>,
}

impl MemoryRemote {
    /// Create a new empty remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` writes with a network error.
    pub fn fail_next_writes(&self, n: u32) {
        self.inner.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` writes with a timeout.
    pub fn time_out_next_writes(&self, n: u32) {
        self.inner.time_out_next.store(n, Ordering::SeqCst);
    }

    /// Reject writes with a permission error while enabled.
    pub fn deny_writes(&self, deny: bool) {
        self.inner.deny.store(deny, Ordering::SeqCst);
    }

    /// Number of documents currently stored in a collection.
    pub fn document_count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .ok()
            .and_then(|map| map.get(collection).map(HashMap::len))
            .unwrap_or(0)
    }

    /// Every successful write, in order.
    pub fn write_log(&self) -> Vec<RemoteDocument> {
        self.inner
            .write_log
            .read()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Push a snapshot to listeners as if it originated remotely.
    pub fn emit(&self, collection: &str, snapshot: Snapshot) {
        for record in snapshot.records {
            self.inner.notify(collection, record);
        }
    }
}

impl RemoteCollection for MemoryRemote {
    fn write(&self, collection: &str, document: RemoteDocument) -> BoxFuture<'_, RemoteResult<()>> {
        let collection = collection.to_string();
        Box::pin(async move { self.inner.store(&collection, document) })
    }

    fn batch_write(
        &self,
        collection: &str,
        documents: Vec<RemoteDocument>,
    ) -> BoxFuture<'_, RemoteResult<()>> {
        let collection = collection.to_string();
        Box::pin(async move {
            for document in documents {
                self.inner.store(&collection, document)?;
            }
            Ok(())
        })
    }

    fn subscribe(
        &self,
        collection: &str,
        listener: SnapshotListener,
    ) -> RemoteResult<Subscription> {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let mut listeners = self
            .inner
            .listeners
            .write()
            .map_err(|_| RemoteError::Network("listener lock poisoned".into()))?;
        listeners
            .entry(collection.to_string())
            .or_default()
            .push((id, Arc::new(listener)));

        let inner = self.inner.clone();
        let collection = collection.to_string();
        Ok(Subscription::new(move || {
            if let Ok(mut listeners) = inner.listeners.write() {
                if let Some(entries) = listeners.get_mut(&collection) {
                    entries.retain(|(listener_id, _)| *listener_id != id);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        // Simple blocking executor for tests
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }

    #[test]
    fn test_kv_roundtrip() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("key", "value").unwrap();
        assert_eq!(store.get("key").unwrap(), Some("value".to_string()));

        store.remove("key").unwrap();
        assert_eq!(store.get("key").unwrap(), None);
    }

    #[test]
    fn test_write_and_log() {
        let remote = MemoryRemote::new();
        let doc = RemoteDocument::new("d1", serde_json::json!({"x": 1}));
        block_on(remote.write("ops", doc.clone())).unwrap();

        assert_eq!(remote.document_count("ops"), 1);
        assert_eq!(remote.write_log(), vec![doc]);
    }

    #[test]
    fn test_failure_injection() {
        let remote = MemoryRemote::new();
        remote.fail_next_writes(1);

        let doc = RemoteDocument::new("d1", serde_json::json!({}));
        let err = block_on(remote.write("ops", doc.clone())).unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));

        // The failure budget is spent; the retry succeeds.
        block_on(remote.write("ops", doc)).unwrap();
        assert_eq!(remote.document_count("ops"), 1);
    }

    #[test]
    fn test_batch_write_applies_in_order() {
        let remote = MemoryRemote::new();
        let docs = vec![
            RemoteDocument::new("d1", serde_json::json!(1)),
            RemoteDocument::new("d2", serde_json::json!(2)),
        ];
        block_on(remote.batch_write("ops", docs.clone())).unwrap();

        assert_eq!(remote.document_count("ops"), 2);
        assert_eq!(remote.write_log(), docs);
    }

    #[test]
    fn test_subscription_receives_and_unsubscribes() {
        let remote = MemoryRemote::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let subscription = remote
            .subscribe(
                "ops",
                Box::new(move |snapshot| {
                    seen_clone.lock().unwrap().extend(snapshot.records);
                }),
            )
            .unwrap();

        block_on(remote.write("ops", RemoteDocument::new("d1", serde_json::json!(1)))).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);

        subscription.unsubscribe();
        block_on(remote.write("ops", RemoteDocument::new("d2", serde_json::json!(2)))).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
