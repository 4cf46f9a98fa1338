use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use crate::registry::Dispatchee;

/// Single-use, timeout-bounded hand-off of one response payload.
///
/// The first [`complete`](Self::complete) wins; later ones are ignored, so a
/// waiter is never satisfied twice.
#[derive(Debug, Default)]
pub struct Completion {
    slot: Mutex<Option<Bytes>>,
    signal: Condvar,
}

impl Completion {
    /// Create an unsatisfied completion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `payload` and wake the waiter. Returns `false` if already done.
    pub fn complete(&self, payload: Bytes) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(payload);
        self.signal.notify_all();
        true
    }

    /// Whether a payload has been delivered.
    pub fn is_done(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Block until completed or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<Bytes> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (slot, _) = self
            .signal
            .wait_timeout_while(slot, timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }
}

impl Dispatchee for Completion {
    fn deliver(&self, payload: Bytes) -> bool {
        self.complete(payload)
    }
}
