//! Key table implementation
//!
//! HashMap-based table behind a Mutex.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::protocol::Reply;
use super::{Clock, MonotonicClock, StoreEntry};

/// Shared key-value table with per-key expiry
pub struct Store {
    /// Key → entry; the only shared mutable state in the server
    entries: Mutex<HashMap<Bytes, StoreEntry>>,

    /// Time source for both writing and checking deadlines
    clock: Arc<dyn Clock>,
}

impl Store {
    /// Create an empty store on the monotonic clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock))
    }

    /// Create an empty store reading time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// `PING` → `+PONG`
    pub fn ping(&self) -> Reply {
        Reply::pong()
    }

    /// `ECHO payload` → the payload as a bulk string
    pub fn echo(&self, payload: Bytes) -> Reply {
        Reply::bulk(payload)
    }

    /// `SET key value [PX ms]` → `+OK`
    ///
    /// Last write wins for both the value and the deadline: a SET without an
    /// expiry clears any previous one.
    pub fn set(&self, key: Bytes, value: Bytes, expiry_ms: Option<u64>) -> Reply {
        let now = self.clock.now();
        // A deadline beyond what Instant can represent never arrives
        let expires_at =
            expiry_ms.and_then(|ms| now.checked_add(Duration::from_millis(ms)));

        self.entries
            .lock()
            .insert(key, StoreEntry { value, expires_at });

        Reply::ok()
    }

    /// `GET key` → the value, or nil when absent or expired
    ///
    /// An expired entry found here is removed.
    pub fn get(&self, key: &[u8]) -> Reply {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                tracing::trace!(key = %String::from_utf8_lossy(key), "evicted expired key on read");
                Reply::nil()
            }
            Some(entry) => Reply::bulk(entry.value.clone()),
            None => Reply::nil(),
        }
    }

    /// Remove every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Physical entry count, including expired entries not yet removed
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries that are still live
    pub fn live_len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Copy of the raw entry, expired or not
    pub fn entry(&self, key: &[u8]) -> Option<StoreEntry> {
        self.entries.lock().get(key).cloned()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
