//! Reply definitions
//!
//! Represents replies to clients.

use bytes::Bytes;

use crate::error::CommandError;

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+<text>\r\n`
    SimpleString(String),

    /// `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` when absent
    BulkString(Option<Bytes>),

    /// `-<message>\r\n`
    Error(String),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::SimpleString("OK".to_string())
    }

    /// `+PONG`
    pub fn pong() -> Self {
        Reply::SimpleString("PONG".to_string())
    }

    /// A bulk string holding `data`
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::BulkString(Some(data.into()))
    }

    /// The nil bulk string
    pub fn nil() -> Self {
        Reply::BulkString(None)
    }

    /// An error reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::BulkString(None))
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::Error(err.to_string())
    }
}
