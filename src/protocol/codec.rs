//! Protocol codec
//!
//! Incremental request decoding and reply encoding for RESP.
//!
//! ## Decoding
//! Bytes from the socket are appended to a [`Decoder`], which hands back one
//! request at a time once a whole frame is buffered. A frame may arrive split
//! across any number of reads; nothing is consumed until it is complete.
//!
//! ```text
//!   buffer: [ *2\r\n$3\r\nGET\r\n$3\r\nkey\r\n | *1\r\n$4\r\nPI ]
//!           └──────── complete frame ─────────┘ └─ kept for the next read
//! ```
//!
//! A complete frame is split off the front of the buffer and frozen, so the
//! arguments handed to [`Command`] are slices of it rather than copies.
//!
//! ## Client side
//! [`encode_command`], [`write_command`] and [`read_reply`] are the mirror
//! image used by the blocking client.

use std::io::{BufRead, Read, Write};
use std::ops::Range;

use bytes::{Buf, Bytes, BytesMut};

use crate::config::ProtocolLimits;
use crate::error::{CommandError, Result, TideError};
use super::{Command, Reply};

/// Initial decode buffer capacity
const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Outcome of decoding one frame
///
/// The outer `Result` of the decoder carries protocol errors; this one carries
/// command errors, which are answered and then forgotten.
pub type Request = std::result::Result<Command, CommandError>;

/// Every request decoded from the buffer in one pass
#[derive(Debug, Default)]
pub struct Decoded {
    /// Requests in arrival order
    pub requests: Vec<Request>,

    /// Bytes removed from the buffer
    pub consumed: usize,
}

// =============================================================================
// Request Decoding
// =============================================================================

/// Incremental RESP request decoder
pub struct Decoder {
    /// Bytes received but not yet decoded
    buffer: BytesMut,

    limits: ProtocolLimits,

    /// How much of the frame at the front of `buffer` is already parsed
    progress: FrameProgress,
}

impl Decoder {
    /// Create a decoder with default limits
    pub fn new() -> Self {
        Self::with_limits(ProtocolLimits::default())
    }

    /// Create a decoder with the given limits
    pub fn with_limits(limits: ProtocolLimits) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            limits,
            progress: FrameProgress::default(),
        }
    }

    /// Append bytes read from the stream
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered, undecoded bytes
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.progress = FrameProgress::default();
    }

    /// Decode the next complete request, if one is buffered
    ///
    /// Returns `Ok(None)` when more bytes are needed. Empty and null arrays
    /// are consumed silently.
    pub fn decode_next(&mut self) -> Result<Option<Request>> {
        loop {
            match scan_frame(&self.buffer, &self.limits, &mut self.progress)? {
                Scan::Incomplete => return Ok(None),
                Scan::Skip(len) => self.buffer.advance(len),
                Scan::Frame { len, args } => {
                    let frame = self.buffer.split_to(len).freeze();
                    let args = args.into_iter().map(|range| frame.slice(range)).collect();
                    return Ok(Some(Command::from_frame(args)));
                }
            }
        }
    }

    /// Decode every complete request currently buffered
    pub fn decode_all(&mut self) -> Result<Decoded> {
        let before = self.buffer.len();
        let mut requests = Vec::new();

        while let Some(request) = self.decode_next()? {
            requests.push(request);
        }

        Ok(Decoded {
            requests,
            consumed: before - self.buffer.len(),
        })
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan state for a frame that has not fully arrived
///
/// Each read only parses the bytes past `pos`, so a large array trickling
/// in over many reads is scanned once.
#[derive(Debug, Default)]
struct FrameProgress {
    /// Element count from the `*<n>` header, once that line is complete
    expected: Option<usize>,

    /// Offset into the buffer where the next element header starts
    pos: usize,

    /// Ranges of the bulk strings parsed so far
    args: Vec<Range<usize>>,
}

/// Result of scanning the front of the buffer
#[derive(Debug, PartialEq)]
enum Scan {
    /// More bytes are needed
    Incomplete,

    /// An empty or null array of `usize` bytes
    Skip(usize),

    /// A complete frame of `len` bytes; `args` index into it
    Frame { len: usize, args: Vec<Range<usize>> },
}

/// Continue scanning the frame at the start of `buf` without copying
///
/// `progress` carries what earlier calls already parsed and is reset once a
/// whole frame is returned.
fn scan_frame(buf: &[u8], limits: &ProtocolLimits, progress: &mut FrameProgress) -> Result<Scan> {
    let count = match progress.expected {
        Some(count) => count,
        None => {
            let Some((header, pos)) = read_line(buf, 0, limits)? else {
                return Ok(Scan::Incomplete);
            };

            let count = match header.split_first() {
                Some((b'*', digits)) => parse_length(digits)
                    .ok_or_else(|| protocol_error("invalid multibulk length"))?,
                Some((other, _)) => {
                    return Err(protocol_error(&format!(
                        "expected '*', got '{}'",
                        char::from(*other).escape_default()
                    )))
                }
                None => return Err(protocol_error("empty request line")),
            };

            if count <= 0 {
                return Ok(Scan::Skip(pos));
            }
            let count = usize::try_from(count)
                .ok()
                .filter(|n| *n <= limits.max_array_len)
                .ok_or_else(|| protocol_error("invalid multibulk length"))?;

            progress.expected = Some(count);
            progress.pos = pos;
            progress.args.reserve(count.min(64));
            count
        }
    };

    while progress.args.len() < count {
        let Some((header, data_start)) = read_line(buf, progress.pos, limits)? else {
            return Ok(Scan::Incomplete);
        };

        let len = match header.split_first() {
            Some((b'$', digits)) => parse_length(digits)
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n <= limits.max_bulk_len)
                .ok_or_else(|| protocol_error("invalid bulk length"))?,
            Some((other, _)) => {
                return Err(protocol_error(&format!(
                    "expected '$', got '{}'",
                    char::from(*other).escape_default()
                )))
            }
            None => return Err(protocol_error("empty bulk header")),
        };

        let data_end = data_start.saturating_add(len);
        if buf.len() < data_end.saturating_add(2) {
            return Ok(Scan::Incomplete);
        }
        if &buf[data_end..data_end + 2] != b"\r\n" {
            return Err(protocol_error("bulk string not terminated by CRLF"));
        }

        progress.args.push(data_start..data_end);
        progress.pos = data_end + 2;
    }

    let done = std::mem::take(progress);
    Ok(Scan::Frame {
        len: done.pos,
        args: done.args,
    })
}

/// Read a CRLF-terminated header line starting at `start`
///
/// Returns the line without its terminator and the offset just past it.
fn read_line<'a>(
    buf: &'a [u8],
    start: usize,
    limits: &ProtocolLimits,
) -> Result<Option<(&'a [u8], usize)>> {
    // A legal line plus "\r\n" fits in this window
    let max_window = limits.max_line_len.saturating_add(2);
    let window_end = buf.len().min(start.saturating_add(max_window));
    let window = &buf[start..window_end];

    match window.iter().position(|&b| b == b'\n') {
        Some(newline) => {
            if newline == 0 || window[newline - 1] != b'\r' {
                return Err(protocol_error("line not terminated by CRLF"));
            }
            Ok(Some((&window[..newline - 1], start + newline + 1)))
        }
        None if window.len() >= max_window => {
            Err(protocol_error("header line too long"))
        }
        None => Ok(None),
    }
}

/// Parse a signed decimal length; anything else is rejected
fn parse_length(digits: &[u8]) -> Option<i64> {
    let unsigned = digits.strip_prefix(b"-").unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse::<i64>().ok()
}

fn protocol_error(detail: &str) -> TideError {
    TideError::Protocol(detail.to_string())
}

// =============================================================================
// Reply Encoding
// =============================================================================

/// Encode a reply to bytes
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut out = Vec::new();
    encode_reply_into(reply, &mut out);
    out
}

/// Append the encoding of a reply to `out`
pub fn encode_reply_into(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::SimpleString(text) => append_line(out, b'+', text),
        Reply::Error(message) => append_line(out, b'-', message),
        Reply::BulkString(Some(data)) => append_bulk(out, data),
        Reply::BulkString(None) => out.extend_from_slice(b"$-1\r\n"),
    }
}

/// Simple strings and errors cannot carry CR or LF; they are flattened to
/// spaces so the framing stays intact.
fn append_line(out: &mut Vec<u8>, prefix: u8, text: &str) {
    out.reserve(text.len() + 3);
    out.push(prefix);
    out.extend(
        text.bytes()
            .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    out.extend_from_slice(b"\r\n");
}

fn append_bulk(out: &mut Vec<u8>, data: &[u8]) {
    out.reserve(data.len() + 16);
    out.push(b'$');
    out.extend_from_slice(data.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

// =============================================================================
// Client-side helpers
// =============================================================================

/// Encode a command as a RESP request array
pub fn encode_command(command: &Command) -> Vec<u8> {
    let frame = command.to_frame();
    let mut out = Vec::with_capacity(16 + frame.iter().map(|a| a.len() + 16).sum::<usize>());

    out.push(b'*');
    out.extend_from_slice(frame.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    for arg in &frame {
        append_bulk(&mut out, arg);
    }

    out
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read one complete reply from a stream
///
/// Blocks until the reply is received or an error occurs. Bulk replies
/// longer than the default bulk limit are rejected.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    read_reply_with_limit(reader, ProtocolLimits::default().max_bulk_len)
}

/// [`read_reply`] with an explicit bulk length bound
pub fn read_reply_with_limit<R: BufRead>(reader: &mut R, max_bulk_len: usize) -> Result<Reply> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Err(TideError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before reply",
        )));
    }
    if !line.ends_with(b"\r\n") {
        return Err(protocol_error("reply line not terminated by CRLF"));
    }
    line.truncate(line.len() - 2);

    let Some((&kind, body)) = line.split_first() else {
        return Err(protocol_error("empty reply line"));
    };

    match kind {
        b'+' => Ok(Reply::SimpleString(String::from_utf8_lossy(body).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(body).into_owned())),
        b'$' => {
            let len = parse_length(body).ok_or_else(|| protocol_error("invalid bulk length"))?;
            if len < 0 {
                return Ok(Reply::nil());
            }
            let len = usize::try_from(len)
                .ok()
                .filter(|n| *n <= max_bulk_len)
                .ok_or_else(|| protocol_error("invalid bulk length"))?;

            // Grows with what actually arrives rather than trusting `len`
            let mut data = Vec::with_capacity(len.min(INITIAL_BUFFER_CAPACITY) + 2);
            let wanted = len as u64 + 2;
            if reader.by_ref().take(wanted).read_to_end(&mut data)? as u64 != wanted {
                return Err(TideError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed inside bulk reply",
                )));
            }
            if !data.ends_with(b"\r\n") {
                return Err(protocol_error("bulk reply not terminated by CRLF"));
            }
            data.truncate(len);
            Ok(Reply::BulkString(Some(Bytes::from(data))))
        }
        other => Err(protocol_error(&format!(
            "unsupported reply type '{}'",
            char::from(other).escape_default()
        ))),
    }
}
