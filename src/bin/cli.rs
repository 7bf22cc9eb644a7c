//! tidekv CLI Client
//!
//! Command-line interface for interacting with tidekv.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use tidekv::protocol::{Command, Reply};
use tidekv::Client;

/// tidekv CLI
#[derive(Parser, Debug)]
#[command(name = "tidekv-cli")]
#[command(about = "CLI for the tidekv key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Echo a message back
    Echo {
        /// The message to echo
        message: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Expire after this many milliseconds
        #[arg(long, conflicts_with = "ex")]
        px: Option<u64>,

        /// Expire after this many seconds
        #[arg(long)]
        ex: Option<u64>,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },
}

impl Commands {
    fn into_command(self) -> Command {
        match self {
            Commands::Ping => Command::Ping,
            Commands::Echo { message } => Command::Echo {
                payload: Bytes::from(message),
            },
            Commands::Set { key, value, px, ex } => Command::Set {
                key: Bytes::from(key),
                value: Bytes::from(value),
                expiry_ms: px.or(ex.map(|secs| secs.saturating_mul(1000))),
            },
            Commands::Get { key } => Command::Get {
                key: Bytes::from(key),
            },
        }
    }
}

/// Render a reply the way redis-cli does
fn render(reply: &Reply) -> String {
    match reply {
        Reply::SimpleString(text) => text.clone(),
        Reply::BulkString(Some(data)) => format!("\"{}\"", String::from_utf8_lossy(data)),
        Reply::BulkString(None) => "(nil)".to_string(),
        Reply::Error(message) => format!("(error) {}", message),
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    match client.send(&args.command.into_command()) {
        Ok(reply) => {
            println!("{}", render(&reply));
            if reply.is_error() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}
