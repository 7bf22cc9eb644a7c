//! Protocol Module
//!
//! RESP (REdis Serialization Protocol) framing for client-server traffic.
//!
//! ## Request Format
//! Every request is an array of bulk strings:
//! ```text
//! *<N>\r\n
//! $<len>\r\n<len bytes>\r\n      (repeated N times)
//! ```
//! The first bulk string is the command name (case-insensitive).
//!
//! ### Commands
//! - `PING`
//! - `ECHO <payload>`
//! - `SET <key> <value> [PX <millis> | EX <seconds>]`
//! - `GET <key>`
//!
//! ## Reply Format
//! ```text
//! +<text>\r\n                    simple string
//! $<len>\r\n<bytes>\r\n          bulk string
//! $-1\r\n                        nil
//! -<message>\r\n                 error
//! ```
//!
//! ## Errors
//! Broken framing is a protocol error and ends the connection. A well-framed
//! request naming an unknown command, or with the wrong arguments, becomes an
//! error reply and the connection carries on.

mod command;
mod reply;
mod codec;

pub use command::{Command, CommandType};
pub use reply::Reply;
pub use codec::{
    Decoded, Decoder, Request,
    encode_command, encode_reply, encode_reply_into,
    read_reply, read_reply_with_limit, write_command,
};
