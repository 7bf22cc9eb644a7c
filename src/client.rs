//! Blocking client
//!
//! A small synchronous RESP client, used by the CLI and the integration
//! tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, TideError};
use crate::protocol::{read_reply, write_command, Command, Reply};

/// Connection to a tidekv server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Fail reads that take longer than `timeout`
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a command and return the reply as-is, error replies included
    pub fn send(&mut self, command: &Command) -> Result<Reply> {
        write_command(&mut self.writer, command)?;
        read_reply(&mut self.reader)
    }

    /// `PING`
    pub fn ping(&mut self) -> Result<String> {
        match self.send(&Command::Ping)? {
            Reply::SimpleString(text) => Ok(text),
            other => Err(unexpected(other)),
        }
    }

    /// `ECHO payload`
    pub fn echo(&mut self, payload: impl Into<Bytes>) -> Result<Bytes> {
        let command = Command::Echo {
            payload: payload.into(),
        };
        match self.send(&command)? {
            Reply::BulkString(Some(data)) => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    /// `SET key value`
    pub fn set(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<()> {
        self.set_with_expiry(key, value, None)
    }

    /// `SET key value PX millis`
    pub fn set_px(
        &mut self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        millis: u64,
    ) -> Result<()> {
        self.set_with_expiry(key, value, Some(millis))
    }

    fn set_with_expiry(
        &mut self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        expiry_ms: Option<u64>,
    ) -> Result<()> {
        let command = Command::Set {
            key: key.into(),
            value: value.into(),
            expiry_ms,
        };
        match self.send(&command)? {
            Reply::SimpleString(text) if text == "OK" => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// `GET key`; `None` when the key is absent or expired
    pub fn get(&mut self, key: impl Into<Bytes>) -> Result<Option<Bytes>> {
        let command = Command::Get { key: key.into() };
        match self.send(&command)? {
            Reply::BulkString(value) => Ok(value),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: Reply) -> TideError {
    match reply {
        Reply::Error(message) => TideError::Server(message),
        other => TideError::Protocol(format!("unexpected reply: {:?}", other)),
    }
}
