//! Engine Module
//!
//! Coordinates the key table and the background sweeper.
//!
//! ## Responsibilities
//! - Build the store on startup
//! - Start and stop the expiry sweeper
//! - Route decoded commands to the store

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{Command, Reply};
use crate::store::{Clock, ExpirySweeper, MonotonicClock, Store};

/// The command execution engine
///
/// ## Concurrency Model
/// `execute` takes `&self` and is called from every connection thread at
/// once. All shared state lives in the [`Store`], whose single lock makes
/// each command atomic. There is no ordering across connections beyond
/// that.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The shared key table
    store: Arc<Store>,

    /// Background purge of expired keys, if enabled
    sweeper: Mutex<Option<ExpirySweeper>>,
}

impl Engine {
    /// Open an engine on the monotonic clock
    pub fn open(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock))
    }

    /// Open an engine reading time from `clock`
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Create the store
    /// 3. Start the sweeper if `sweep_interval_ms > 0`
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(Store::with_clock(clock));

        let sweeper = if config.sweeper_enabled() {
            let interval = Duration::from_millis(config.sweep_interval_ms);
            Some(ExpirySweeper::spawn(Arc::clone(&store), interval)?)
        } else {
            tracing::debug!("expiry sweeper disabled, relying on lazy eviction");
            None
        };

        Ok(Self {
            config,
            store,
            sweeper: Mutex::new(sweeper),
        })
    }

    /// Execute a command
    ///
    /// Routes commands to the matching store operation.
    pub fn execute(&self, command: Command) -> Reply {
        match command {
            Command::Ping => self.store.ping(),
            Command::Echo { payload } => self.store.echo(payload),
            Command::Set {
                key,
                value,
                expiry_ms,
            } => self.store.set(key, value, expiry_ms),
            Command::Get { key } => self.store.get(&key),
        }
    }

    /// Stop background work
    ///
    /// Safe to call more than once. Commands still execute afterwards, with
    /// lazy eviction only.
    pub fn close(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the store
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Whether the sweeper thread is running
    pub fn sweeper_running(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}
