//! Configuration for tidekv
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, TideError};

/// Main configuration for a tidekv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = wait forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = wait forever)
    pub write_timeout_ms: u64,

    /// Bytes requested from the socket per read
    pub read_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Upper bounds enforced by the request decoder
    pub limits: ProtocolLimits,

    // -------------------------------------------------------------------------
    // Expiry Configuration
    // -------------------------------------------------------------------------
    /// How often the background sweeper purges expired keys
    /// (milliseconds, 0 = lazy eviction only)
    pub sweep_interval_ms: u64,
}

/// Decoder limits
///
/// A request breaking any of these is a protocol error and the connection
/// is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolLimits {
    /// Max elements in one request array
    pub max_array_len: usize,

    /// Max bytes in one bulk string
    pub max_bulk_len: usize,

    /// Max bytes in a `*<n>` or `$<n>` header line, excluding CRLF
    pub max_line_len: usize,
}

pub const DEFAULT_MAX_ARRAY_LEN: usize = 1024 * 1024;
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024; // 512 MB
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            read_buffer_size: 16 * 1024, // 16 KB
            limits: ProtocolLimits::default(),
            sweep_interval_ms: 100,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(TideError::Config("listen address is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(TideError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.read_buffer_size == 0 {
            return Err(TideError::Config(
                "read_buffer_size must be at least 1".to_string(),
            ));
        }
        let limits = &self.limits;
        if limits.max_array_len == 0 || limits.max_bulk_len == 0 || limits.max_line_len == 0 {
            return Err(TideError::Config(format!(
                "protocol limits must be non-zero: {:?}",
                limits
            )));
        }
        Ok(())
    }

    /// Whether the background sweeper should run
    pub fn sweeper_enabled(&self) -> bool {
        self.sweep_interval_ms > 0
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the per-read socket buffer size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the decoder limits
    pub fn limits(mut self, limits: ProtocolLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Set the sweep interval (in milliseconds, 0 disables the sweeper)
    pub fn sweep_interval_ms(mut self, ms: u64) -> Self {
        self.config.sweep_interval_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
