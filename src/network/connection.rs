//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{Result, TideError};
use crate::protocol::{encode_reply_into, Decoder, Reply};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader; buffering is done by the decoder
    reader: TcpStream,

    /// TCP stream writer
    writer: TcpStream,

    /// Partial-frame buffer and request decoder
    decoder: Decoder,

    /// Scratch space for socket reads
    read_buf: Vec<u8>,

    /// Encoded replies waiting to be written
    pending: Vec<u8>,

    /// Reference to the engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let config = engine.config();

        Ok(Self {
            reader: read_stream,
            writer: stream,
            decoder: Decoder::with_limits(config.limits),
            read_buf: vec![0u8; config.read_buffer_size],
            pending: Vec::new(),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads bytes, executes every complete request in arrival order and
    /// writes the replies back in one batch per read. Returns `Ok` when the
    /// client goes away and `Err` on a protocol or I/O failure; either way
    /// the caller drops the connection, discarding any partial frame.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "connection established");

        loop {
            let n = match self.reader.read(&mut self.read_buf) {
                Ok(0) => {
                    tracing::debug!(
                        peer = %self.peer_addr,
                        discarded = self.decoder.buffered(),
                        "client disconnected"
                    );
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    // Read timeout (Windows uses TimedOut instead of WouldBlock)
                    tracing::debug!(peer = %self.peer_addr, "read timeout, closing");
                    return Ok(());
                }
                Err(e) => {
                    let err = TideError::from(e);
                    if err.is_disconnect() {
                        tracing::debug!(peer = %self.peer_addr, "connection reset by client");
                        return Ok(());
                    }
                    return Err(err);
                }
            };

            self.decoder.feed(&self.read_buf[..n]);
            let decoded = self.execute_buffered();

            if let Err(e) = decoded {
                // Replies for requests ahead of the bad frame still go out
                tracing::warn!(peer = %self.peer_addr, error = %e, "protocol error, closing connection");
                encode_reply_into(&Reply::error(format!("ERR {}", e)), &mut self.pending);
                if let Err(flush_err) = self.flush_pending() {
                    tracing::debug!(peer = %self.peer_addr, error = %flush_err, "could not send protocol error reply");
                }
                return Err(e);
            }

            if let Err(e) = self.flush_pending() {
                if e.is_disconnect() {
                    tracing::debug!(
                        peer = %self.peer_addr,
                        "client disconnected before reply could be sent"
                    );
                    return Ok(());
                }
                tracing::warn!(peer = %self.peer_addr, error = %e, "write failed");
                return Err(e);
            }
        }
    }

    /// Execute every complete request in the decoder, queueing the replies
    fn execute_buffered(&mut self) -> Result<()> {
        while let Some(request) = self.decoder.decode_next()? {
            let reply = match request {
                Ok(command) => {
                    tracing::trace!(peer = %self.peer_addr, command = ?command.command_type(), "executing");
                    self.engine.execute(command)
                }
                Err(e) => {
                    tracing::debug!(peer = %self.peer_addr, error = %e, "rejected command");
                    Reply::from(e)
                }
            };
            encode_reply_into(&reply, &mut self.pending);
        }
        Ok(())
    }

    /// Write queued replies to the socket
    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let result = self.writer.write_all(&self.pending).and_then(|_| self.writer.flush());
        self.pending.clear();
        result.map_err(TideError::from)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
