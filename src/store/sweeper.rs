//! Background expiry sweeper
//!
//! Keys that expire and are never read again would otherwise stay in the
//! table forever. The sweeper purges them on a fixed period from its own
//! thread, taking the same lock as every other store operation.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Sender};

use crate::error::Result;
use super::Store;

/// Handle to the sweeper thread
///
/// The thread stops when the handle is stopped or dropped.
pub struct ExpirySweeper {
    /// Dropping this wakes the thread and tells it to exit
    stop_tx: Option<Sender<()>>,

    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Start sweeping `store` every `interval`
    pub fn spawn(store: Arc<Store>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("tidekv-sweeper".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                tracing::debug!(interval_ms = interval.as_millis() as u64, "expiry sweeper started");

                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let removed = store.purge_expired();
                            if removed > 0 {
                                tracing::debug!(removed, remaining = store.len(), "swept expired keys");
                            }
                        }
                    }
                }

                tracing::debug!("expiry sweeper stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("expiry sweeper thread panicked");
            }
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
