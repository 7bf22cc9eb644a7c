//! Command definitions
//!
//! Represents commands from clients, and the mapping from a decoded RESP
//! array to a typed command.

use bytes::Bytes;

use crate::error::CommandError;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Ping,
    Echo,
    Set,
    Get,
}

impl CommandType {
    /// Look up a command by its wire name, ignoring ASCII case
    pub fn from_name(name: &[u8]) -> Option<Self> {
        const TABLE: [(&[u8], CommandType); 4] = [
            (b"PING", CommandType::Ping),
            (b"ECHO", CommandType::Echo),
            (b"SET", CommandType::Set),
            (b"GET", CommandType::Get),
        ];

        TABLE
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, ty)| *ty)
    }

    /// Canonical (uppercase) wire name
    pub fn name(&self) -> &'static str {
        match self {
            CommandType::Ping => "PING",
            CommandType::Echo => "ECHO",
            CommandType::Set => "SET",
            CommandType::Get => "GET",
        }
    }

    fn arity_error(&self) -> CommandError {
        CommandError::WrongArity(self.name().to_ascii_lowercase())
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ping (health check)
    Ping,

    /// Return the payload unchanged
    Echo { payload: Bytes },

    /// Set a key-value pair, optionally expiring after `expiry_ms`
    Set {
        key: Bytes,
        value: Bytes,
        expiry_ms: Option<u64>,
    },

    /// Get a value by key
    Get { key: Bytes },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Ping => CommandType::Ping,
            Command::Echo { .. } => CommandType::Echo,
            Command::Set { .. } => CommandType::Set,
            Command::Get { .. } => CommandType::Get,
        }
    }

    /// Build a command from the bulk strings of one request array
    ///
    /// `args[0]` is the command name.
    pub fn from_frame(args: Vec<Bytes>) -> Result<Command, CommandError> {
        let Some((name, rest)) = args.split_first() else {
            return Err(CommandError::UnknownCommand(String::new()));
        };

        let command_type = CommandType::from_name(name).ok_or_else(|| {
            CommandError::UnknownCommand(String::from_utf8_lossy(name).into_owned())
        })?;

        match (command_type, rest) {
            (CommandType::Ping, []) => Ok(Command::Ping),
            (CommandType::Echo, [payload]) => Ok(Command::Echo {
                payload: payload.clone(),
            }),
            (CommandType::Get, [key]) => Ok(Command::Get { key: key.clone() }),
            (CommandType::Set, [key, value, options @ ..]) => Ok(Command::Set {
                key: key.clone(),
                value: value.clone(),
                expiry_ms: parse_set_expiry(options)?,
            }),
            (ty, _) => Err(ty.arity_error()),
        }
    }

    /// Render the command as the bulk strings of a request array
    pub fn to_frame(&self) -> Vec<Bytes> {
        let name = Bytes::from_static(self.command_type().name().as_bytes());
        match self {
            Command::Ping => vec![name],
            Command::Echo { payload } => vec![name, payload.clone()],
            Command::Get { key } => vec![name, key.clone()],
            Command::Set {
                key,
                value,
                expiry_ms,
            } => {
                let mut frame = vec![name, key.clone(), value.clone()];
                if let Some(ms) = expiry_ms {
                    frame.push(Bytes::from_static(b"PX"));
                    frame.push(Bytes::from(ms.to_string()));
                }
                frame
            }
        }
    }
}

/// Parse the optional `PX <millis>` / `EX <seconds>` pair of SET
fn parse_set_expiry(options: &[Bytes]) -> Result<Option<u64>, CommandError> {
    let mut expiry_ms = None;
    let mut iter = options.iter();

    while let Some(option) = iter.next() {
        let unit_ms: u64 = if option.eq_ignore_ascii_case(b"PX") {
            1
        } else if option.eq_ignore_ascii_case(b"EX") {
            1000
        } else {
            return Err(CommandError::Syntax);
        };

        // Only one expiry option is allowed
        if expiry_ms.is_some() {
            return Err(CommandError::Syntax);
        }

        let raw = iter.next().ok_or(CommandError::Syntax)?;
        let amount = parse_integer(raw).ok_or(CommandError::NotAnInteger)?;
        if amount <= 0 {
            return Err(CommandError::InvalidExpireTime("set".to_string()));
        }

        let millis = (amount as u64)
            .checked_mul(unit_ms)
            .ok_or_else(|| CommandError::InvalidExpireTime("set".to_string()))?;
        expiry_ms = Some(millis);
    }

    Ok(expiry_ms)
}

/// Optional `-` then decimal digits; no `+`, no whitespace
fn parse_integer(raw: &[u8]) -> Option<i64> {
    let digits = raw.strip_prefix(b"-").unwrap_or(raw);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(raw).ok()?.parse::<i64>().ok()
}
