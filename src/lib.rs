//! # tidekv
//!
//! An in-memory key-value store speaking RESP, with:
//! - PING / ECHO / SET (with `PX` / `EX` expiry) / GET
//! - Lazy eviction of expired keys on read
//! - A background sweeper for expired keys nobody reads
//! - Thread-per-connection TCP server with pipelining
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ bytes
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Protocol Codec                              │
//! │        (incremental decoder, reply encoder)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command / Reply
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine                                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Store    │◄─────────│   Sweeper   │
//!   │   (Mutex)   │  purge   │  (thread)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod store;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CommandError, Result, TideError};
pub use config::{Config, ProtocolLimits};
pub use engine::Engine;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tidekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
