//! Store Module
//!
//! In-memory key table with per-key expiry.
//!
//! ## Responsibilities
//! - Serve SET/GET/PING/ECHO semantics
//! - Treat keys past their deadline as absent, even before they are removed
//! - Remove expired keys lazily on GET and eagerly via [`ExpirySweeper`]
//!
//! ## Concurrency
//! A single `parking_lot::Mutex` guards the whole table, so every operation
//! is atomic with respect to every other. Lazy and eager eviction both read
//! time from the same [`Clock`].

mod clock;
mod table;
mod sweeper;

use std::time::Instant;

use bytes::Bytes;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use table::Store;
pub use sweeper::ExpirySweeper;

/// Entry stored in the key table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// The stored value
    pub value: Bytes,

    /// Deadline after which the entry is dead; `None` lives forever
    pub expires_at: Option<Instant>,
}

impl StoreEntry {
    /// Whether the entry is dead at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}
