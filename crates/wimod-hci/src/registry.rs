use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use tracing::trace;
use wimod_frame::Frame;

/// Receives the payload of a routed frame.
pub trait Dispatchee: Send + Sync {
    /// Accept `payload`. Returns `false` if the target was already satisfied,
    /// in which case the call must have had no effect.
    fn deliver(&self, payload: Bytes) -> bool;
}

/// Routing key of a waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub dst_id: u8,
    pub msg_id: u8,
}

impl MatchKey {
    pub fn new(dst_id: u8, msg_id: u8) -> Self {
        Self { dst_id, msg_id }
    }

    fn matches(&self, frame: &Frame) -> bool {
        self.dst_id == frame.dst_id && self.msg_id == frame.msg_id
    }
}

struct Entry {
    id: u64,
    key: MatchKey,
    target: Arc<dyn Dispatchee>,
}

/// Shared, ordered set of waiters for one link.
///
/// Dispatch takes a read lock and registration churn a write lock, so many
/// frames can be routed while requesters come and go. Entries are scanned
/// in registration order and only the first match receives a frame.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a waiter. It stays registered until the returned guard is dropped.
    pub fn register(&self, key: MatchKey, target: Arc<dyn Dispatchee>) -> Registration<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry { id, key, target });
        trace!(id, dst_id = key.dst_id, msg_id = key.msg_id, "waiter registered");
        Registration { registry: self, id }
    }

    fn unregister(&self, id: u64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = entries.iter().position(|entry| entry.id == id) {
            entries.remove(pos);
            trace!(id, "waiter unregistered");
        }
    }

    /// Route `frame` to the first waiter whose key matches it.
    ///
    /// Returns `true` if a matching waiter was found, whether or not it had
    /// already been satisfied. Unmatched frames are dropped.
    pub fn dispatch(&self, frame: &Frame) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.iter().find(|entry| entry.key.matches(frame)) {
            Some(entry) => {
                let accepted = entry.target.deliver(frame.payload.clone());
                trace!(id = entry.id, accepted, "frame dispatched");
                true
            }
            None => false,
        }
    }

    /// Number of registered waiters.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no waiter is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("waiters", &self.len())
            .finish()
    }
}

/// Keeps a waiter registered; unregisters it on drop.
#[must_use = "dropping the registration unregisters the waiter immediately"]
pub struct Registration<'a> {
    registry: &'a Registry,
    id: u64,
}

impl Registration<'_> {
    /// Registry-unique id of this waiter.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

impl std::fmt::Debug for Registration<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}
