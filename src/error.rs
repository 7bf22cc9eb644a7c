//! Error types for tidekv
//!
//! Provides a unified error type for all operations, plus the
//! recoverable [`CommandError`] that is sent back to clients as a RESP
//! error reply.

use thiserror::Error;

/// Result type alias using TideError
pub type Result<T> = std::result::Result<T, TideError>;

/// Unified error type for tidekv operations
#[derive(Debug, Error)]
pub enum TideError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors (connection is closed)
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Command Errors (reported to the client, connection stays open)
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Command(#[from] CommandError),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server replied with error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TideError {
    /// True for errors that mean the peer went away rather than misbehaved
    pub fn is_disconnect(&self) -> bool {
        match self {
            TideError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// A command that was framed correctly but cannot be executed
///
/// The `Display` output is the exact text of the RESP error reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),
}
