//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use super::Connection;

/// Back-off between accept attempts when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sent to a client accepted over `max_connections`
const MAX_CLIENTS_REPLY: &[u8] = b"-ERR max number of clients reached\r\n";

/// TCP server for tidekv
pub struct Server {
    config: Config,
    engine: Arc<Engine>,

    /// Non-blocking listener, polled so shutdown is noticed
    listener: TcpListener,

    shutdown: Arc<AtomicBool>,

    /// Connections currently being served
    active: Arc<AtomicUsize>,
}

/// Cloneable handle that stops [`Server::run`]
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Holds one unit of the connection budget until dropped
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Signal the server to shut down gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept connections until shut down (blocking)
    ///
    /// Connections already being served keep their threads; they end when
    /// their clients disconnect.
    pub fn run(&self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "server listening");

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!(
            active = self.active_connections(),
            "server stopped accepting connections"
        );
        Ok(())
    }

    /// Reserve a connection slot and spawn the handler thread
    fn dispatch(&self, mut stream: TcpStream, peer: SocketAddr) {
        // Some platforms hand out sockets inheriting the listener's mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!(%peer, error = %e, "failed to configure socket");
            return;
        }

        let previous = self.active.fetch_add(1, Ordering::SeqCst);
        let slot = ConnectionSlot {
            active: Arc::clone(&self.active),
        };
        if previous >= self.config.max_connections {
            tracing::warn!(%peer, max = self.config.max_connections, "rejecting client, connection limit reached");
            let _ = stream.write_all(MAX_CLIENTS_REPLY);
            return;
        }

        let engine = Arc::clone(&self.engine);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name("tidekv-conn".to_string())
            .spawn(move || {
                let _slot = slot;
                serve(stream, engine, read_ms, write_ms);
            });

        if let Err(e) = spawned {
            tracing::error!(%peer, error = %e, "failed to spawn connection thread");
        }
    }
}

/// Run one connection to completion
fn serve(stream: TcpStream, engine: Arc<Engine>, read_ms: u64, write_ms: u64) {
    let mut connection = match Connection::new(stream, engine) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!(error = %e, "failed to set up connection");
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!(peer = connection.peer_addr(), error = %e, "failed to set timeouts");
        return;
    }

    if let Err(e) = connection.handle() {
        tracing::debug!(peer = connection.peer_addr(), error = %e, "connection closed with error");
    }
}
