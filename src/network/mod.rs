//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - One thread per client connection, capped by `max_connections`
//! - Commands routed through Engine

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
